use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum LogFormat {
    #[default]
    Plaintext,
    Console,
    Json,
}

impl LogFormat {
    /// Unknown names fall back to plaintext so a new pipeline setting never breaks the run.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "console" => Self::Console,
            "json" | "stackdriver" | "v3" => Self::Json,
            _ => Self::Plaintext,
        }
    }
}

pub fn init(format: LogFormat) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match format {
        LogFormat::Plaintext => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_ansi(false)
                    .with_target(false),
            )
            .try_init(),
        LogFormat::Console => registry
            .with(tracing_subscriber::fmt::layer().with_ansi(true).with_target(false))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_span_list(false)
                    .with_target(true),
            )
            .try_init(),
    };
    result.map_err(|err| anyhow::anyhow!("failed to initialize logging: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_formats() {
        assert_eq!(LogFormat::from_name("plaintext"), LogFormat::Plaintext);
        assert_eq!(LogFormat::from_name("console"), LogFormat::Console);
        assert_eq!(LogFormat::from_name("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::from_name("stackdriver"), LogFormat::Json);
    }

    #[test]
    fn unknown_format_falls_back_to_plaintext() {
        assert_eq!(LogFormat::from_name(""), LogFormat::Plaintext);
        assert_eq!(LogFormat::from_name("fancy"), LogFormat::Plaintext);
    }
}
