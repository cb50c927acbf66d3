use std::fmt;
use std::fmt::Write;
use std::path::PathBuf;

use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::{format::FmtSpan, Layer as FmtLayer};
use tracing_subscriber::{prelude::*, registry::Registry, reload, EnvFilter};

mod combined;

use super::app_config::config;
use super::error::Result;

pub mod prelude {
    pub use tracing::{debug, error, info, trace, warn};
    pub use tracing::{debug_span, error_span, info_span, trace_span, warn_span};
    pub use tracing::{event, field::Empty, instrument, span};
}

pub fn setup() -> Result<LoggingContext> {
    LoggingContext::new()
}

/// Owns the non-blocking writers; must be held in main until exit so buffered lines get flushed
pub struct LoggingContext {
    worker_guards: Vec<WorkerGuard>,
    reload_handle: reload::Handle<combined::Layer<Registry>, Registry>,
}

impl LoggingContext {
    /// Install the global subscriber with the built-in defaults
    pub fn new() -> Result<Self> {
        let (layer, handle) = reload::Layer::new(combined::Layer::empty());
        Registry::default().with(layer).try_init()?;

        let mut ctx = LoggingContext {
            worker_guards: vec![],
            reload_handle: handle,
        };

        ctx.reconfigure_with(Default::default(), false)?;

        Ok(ctx)
    }

    /// Rebuild all outputs from the `logging` config section.
    ///
    /// `produces_output` tells whether the running command prints its results on stdout.
    pub fn reconfigure(&mut self, produces_output: bool) -> Result<()> {
        let cfg: LoggingConfig = config().get("logging")?;
        self.reconfigure_with(cfg, produces_output)
    }

    fn reconfigure_with(&mut self, cfg: LoggingConfig, produces_output: bool) -> Result<()> {
        let mut layer = combined::Layer::empty();
        let mut guards = vec![];
        for output in cfg.outputs.iter().filter(|o| o.enabled) {
            let (output_layer, guard) = output_layer(output, &cfg.filter, produces_output);
            layer.add(output_layer);
            guards.push(guard);
        }
        self.reload_handle.reload(layer)?;

        // the previous writers are out of use now, dropping their guards flushes them
        self.worker_guards = guards;

        Ok(())
    }
}

fn output_layer(
    output: &LoggingOutput,
    global_filter: &FilterConfig,
    produces_output: bool,
) -> (combined::Layer<Registry>, WorkerGuard) {
    let span_events = output
        .span_events
        .iter()
        .fold(FmtSpan::NONE, |f, e| f | (*e).into());

    let (writer, guard) = output.target.to_writer(produces_output);

    let mut layer = combined::Layer::empty();
    layer
        .add(output.filter.or(global_filter).to_env_filter())
        .add(
            FmtLayer::default()
                .with_ansi(output.target.supports_color())
                .with_target(false)
                .with_span_events(span_events)
                .with_timer(LocalTime)
                .with_writer(writer),
        );
    (layer, guard)
}

/// Local wall clock with millisecond precision
struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut dyn Write) -> fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

// ====== Config to Layer ======

impl FilterConfig {
    fn to_env_filter(&self) -> EnvFilter {
        let filter = match &self.from_env {
            Some(env) => EnvFilter::from_env(env),
            None => EnvFilter::default(),
        };

        match &self.directives {
            Some(dirs) => dirs
                .split(',')
                .filter_map(|s| match s.trim().parse() {
                    Ok(d) => Some(d),
                    Err(err) => {
                        eprintln!("ignoring log directive `{}`: {}", s, err);
                        None
                    }
                })
                .fold(filter, |f, dir| f.add_directive(dir)),
            None => filter,
        }
    }

    /// Fill unset fields from `fallback`
    fn or(&self, fallback: &FilterConfig) -> FilterConfig {
        Self {
            directives: self
                .directives
                .clone()
                .or_else(|| fallback.directives.clone()),
            from_env: self
                .from_env
                .clone()
                .or_else(|| fallback.from_env.clone()),
        }
    }

    fn empty() -> Self {
        Self {
            directives: None,
            from_env: None,
        }
    }
}

impl LoggingTarget {
    fn supports_color(&self) -> bool {
        match self {
            LoggingTarget::Term(_) => true,
            LoggingTarget::File(_) => false,
        }
    }

    fn to_writer(&self, produces_output: bool) -> (NonBlocking, WorkerGuard) {
        let builder = NonBlockingBuilder::default().lossy(false);
        match self {
            LoggingTarget::Term(term) => match term.name {
                // keep stdout clean for results when asked to
                TermTarget::Stdout if !(term.auto_switch && produces_output) => builder.finish(std::io::stdout()),
                _ => builder.finish(std::io::stderr()),
            },
            LoggingTarget::File(file) => {
                builder.finish(RollingFileAppender::new(Rotation::NEVER, &file.directory, &file.name))
            }
        }
    }
}

impl From<SpanEvent> for FmtSpan {
    fn from(e: SpanEvent) -> Self {
        match e {
            SpanEvent::New => FmtSpan::NEW,
            SpanEvent::Enter => FmtSpan::ENTER,
            SpanEvent::Exit => FmtSpan::EXIT,
            SpanEvent::Close => FmtSpan::CLOSE,
            SpanEvent::Active => FmtSpan::ACTIVE,
            SpanEvent::Full => FmtSpan::FULL,
        }
    }
}

// ====== Logging Config ======

#[derive(Debug, serde::Deserialize)]
struct LoggingConfig {
    filter: FilterConfig,
    #[serde(default)]
    outputs: Vec<LoggingOutput>,
}

#[derive(Debug, Clone, serde::Deserialize)]
struct FilterConfig {
    #[serde(default)]
    directives: Option<String>,
    #[serde(default, deserialize_with = "deserialize_filter_from_env")]
    from_env: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct LoggingOutput {
    enabled: bool,
    #[serde(default)]
    span_events: Vec<SpanEvent>,
    #[serde(default = "FilterConfig::empty")]
    filter: FilterConfig,
    target: LoggingTarget,
}

#[derive(Copy, Clone, Debug, serde::Deserialize)]
enum SpanEvent {
    New,
    Enter,
    Exit,
    Close,
    Active,
    Full,
}

#[derive(Debug, serde::Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "lowercase")]
enum LoggingTarget {
    Term(TermOutput),
    File(FileOutput),
}

#[derive(Debug, serde::Deserialize)]
struct TermOutput {
    name: TermTarget,
    #[serde(default)]
    auto_switch: bool,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
enum TermTarget {
    Stdout,
    Stderr,
}

#[derive(Debug, serde::Deserialize)]
struct FileOutput {
    directory: PathBuf,
    name: PathBuf,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            directives: Some("info".into()),
            from_env: Some("CLOUDSCHED_LOG".into()),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: Default::default(),
            outputs: vec![LoggingOutput {
                enabled: true,
                span_events: vec![],
                filter: FilterConfig::empty(),
                target: LoggingTarget::Term(TermOutput {
                    name: TermTarget::Stderr,
                    auto_switch: false,
                }),
            }],
        }
    }
}

// ====== serde helpers ======

/// Deserialize `false` to `None`, `true` to `Some("CLOUDSCHED_LOG")`, and string to `Some(xxx)`
fn deserialize_filter_from_env<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct VisitFromEnv;

    impl<'de> serde::de::Visitor<'de> for VisitFromEnv {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("bool or environment variable name")
        }

        fn visit_bool<E>(self, value: bool) -> std::result::Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(if value { Some("CLOUDSCHED_LOG".into()) } else { None })
        }

        fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(Some(value.to_owned()))
        }
    }

    deserializer.deserialize_any(VisitFromEnv)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_filter_falls_back_per_field() {
        let global = FilterConfig::default();
        let local = FilterConfig {
            directives: Some("debug".into()),
            from_env: None,
        };

        let merged = local.or(&global);
        assert_eq!(merged.directives.as_deref(), Some("debug"));
        assert_eq!(merged.from_env.as_deref(), Some("CLOUDSCHED_LOG"));

        let merged = FilterConfig::empty().or(&global);
        assert_eq!(merged.directives.as_deref(), Some("info"));
    }

    #[test]
    fn default_logging_goes_to_stderr() {
        let cfg = LoggingConfig::default();
        assert_eq!(cfg.outputs.len(), 1);
        assert!(matches!(
            &cfg.outputs[0].target,
            LoggingTarget::Term(TermOutput {
                name: TermTarget::Stderr,
                ..
            })
        ));
    }
}
