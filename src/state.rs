use crate::error::{ConfigError, ProtocolError, Result};

/// Progress of one protocol instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProtocolState {
    Idle,
    TablesExchanged,
    InputKeysExchanged,
    OtComplete,
    Evaluated,
    Done,
    /// Terminal. Reached from any state on the first failure.
    Aborted,
}

impl ProtocolState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }

    /// Fails unless the instance has never been run.
    pub(crate) fn ensure_idle(self) -> Result<()> {
        if self == Self::Idle {
            Ok(())
        } else {
            Err(ConfigError::AlreadyRun(self).into())
        }
    }
}

/// Runs `f` and moves `state` to `Aborted` if it fails.
pub(crate) fn abort_on_error<T>(
    state: &mut ProtocolState,
    f: impl FnOnce(&mut ProtocolState) -> Result<T>,
) -> Result<T> {
    state.ensure_idle()?;
    f(state).map_err(|err: ProtocolError| {
        tracing::warn!(state = ?*state, error = %err, "protocol aborted");
        *state = ProtocolState::Aborted;
        err
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abort_on_error_marks_aborted() {
        let mut state = ProtocolState::Idle;
        let result: Result<()> = abort_on_error(&mut state, |s| {
            *s = ProtocolState::TablesExchanged;
            Err(ConfigError::MissingDecommitments.into())
        });
        assert!(result.is_err());
        assert_eq!(state, ProtocolState::Aborted);
        assert!(state.is_terminal());
    }

    #[test]
    fn test_rerun_is_rejected() {
        let mut state = ProtocolState::Done;
        let result = abort_on_error(&mut state, |_| Ok(()));
        assert!(matches!(
            result,
            Err(ProtocolError::Configuration(ConfigError::AlreadyRun(
                ProtocolState::Done
            )))
        ));
        // A rejected rerun does not touch the finished instance.
        assert_eq!(state, ProtocolState::Done);
    }
}
