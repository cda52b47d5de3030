use clap::ValueEnum;
use serde::Deserialize;
use tracing_subscriber::filter::{Directive, EnvFilter, LevelFilter};

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    #[serde(alias = "warning")]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Log targets that carry discovery traffic.
const UDP_TARGETS: &[&str] = &["drhd_driver::explorer", "drhd_transport::udp"];

/// Log targets that carry command-session traffic.
const TCP_TARGETS: &[&str] = &[
    "drhd_driver::matrix",
    "drhd_frame::reader",
    "drhd_frame::writer",
    "drhd_transport::tcp",
];

/// Log levels for the whole process and for each network component.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LogLevels {
    pub base: LogLevel,
    pub udp: Option<LogLevel>,
    pub tcp: Option<LogLevel>,
}

impl LogLevels {
    /// Filter directives: the base level plus one override per component target.
    pub fn directives(&self) -> Vec<String> {
        let mut directives = vec![self.base.as_str().to_string()];
        for (targets, level) in [(UDP_TARGETS, self.udp), (TCP_TARGETS, self.tcp)] {
            if let Some(level) = level {
                directives.extend(
                    targets
                        .iter()
                        .map(|target| format!("{target}={}", level.as_str())),
                );
            }
        }
        directives
    }

    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::default().add_directive(self.base.as_filter().into());
        for directive in self.directives().into_iter().skip(1) {
            if let Ok(directive) = directive.parse::<Directive>() {
                filter = filter.add_directive(directive);
            }
        }
        filter
    }
}

pub fn init_logging(format: LogFormat, levels: LogLevels) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(levels.env_filter())
        .with_ansi(false)
        .with_target(true);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}
