use crate::exit_codes::ExitCode;

#[derive(Debug)]
pub enum RunError {
    InvalidInput(anyhow::Error),
    Failed(anyhow::Error),
}

impl RunError {
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::InvalidInput(_) => ExitCode::InvalidInput,
            Self::Failed(_) => ExitCode::Failed,
        }
    }

    #[must_use]
    pub fn anyhow(&self) -> &anyhow::Error {
        match self {
            Self::InvalidInput(e) | Self::Failed(e) => e,
        }
    }
}

impl From<paketprobe_core::Error> for RunError {
    fn from(err: paketprobe_core::Error) -> Self {
        use paketprobe_core::Error;
        match err {
            Error::InvalidBaseUrl(_) | Error::InvalidPort(_) | Error::InvalidRequestCount => {
                Self::InvalidInput(err.into())
            }
            _ => Self::Failed(err.into()),
        }
    }
}

impl std::fmt::Display for RunError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#}", self.anyhow())
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.anyhow().as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let bad_port: RunError = paketprobe_core::Error::InvalidPort("x".to_string()).into();
        assert_eq!(bad_port.exit_code(), ExitCode::InvalidInput);

        let unreachable: RunError = paketprobe_core::Error::Connectivity {
            url: "http://localhost:3000/api/health".to_string(),
            reason: "connection refused".to_string(),
        }
        .into();
        assert_eq!(unreachable.exit_code(), ExitCode::Failed);
        assert!(unreachable.to_string().contains("connection refused"));
    }
}
