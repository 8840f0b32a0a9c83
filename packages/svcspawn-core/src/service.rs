//! The immutable service descriptor and its legacy-field aliasing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::error::SpawnMiddlewareError;
use crate::language::Language;

/// A log sink a service may supply; falls back to the `log` facade when
/// absent. Boxed so callers can plug in per-service routing.
pub type LogSink = Arc<dyn Fn(log::Level, &str) + Send + Sync>;

/// Raw, possibly-legacy fields as received from a host/config layer.
/// Every legacy alias (`source`, `themeSource`, `presenterSource`,
/// `lang`) is normalized away here, once, at construction time — nothing
/// downstream of [`ServiceDescriptor`] ever sees a legacy key again.
#[derive(Debug, Clone, Default)]
pub struct ServiceDescriptorInput {
    pub code: Option<String>,
    pub source: Option<String>,
    pub language: Option<String>,
    pub lang: Option<String>,
    pub view: Option<String>,
    pub theme_source: Option<String>,
    pub presenter: Option<String>,
    pub presenter_source: Option<String>,
    pub custom_timeout: Option<Duration>,
    pub config: Option<serde_json::Value>,
    pub is_hookio: bool,
    pub env: HashMap<String, String>,
    pub log: Option<LogSink>,
}

/// Immutable per-handler service descriptor. Built once at handler
/// construction; `code` may be overridden per request (see
/// [`ServiceDescriptor::with_code`]).
#[derive(Clone, Serialize)]
pub struct ServiceDescriptor {
    pub code: String,
    pub language: Language,
    pub view: Option<String>,
    pub presenter: Option<String>,
    pub custom_timeout: Option<Duration>,
    pub config: Option<serde_json::Value>,
    pub is_hookio: bool,
    pub env: HashMap<String, String>,

    #[serde(skip)]
    pub log: Option<LogSink>,
}

impl ServiceDescriptor {
    /// Normalize a raw input into an immutable descriptor.
    ///
    /// # Errors
    /// [`SpawnMiddlewareError::Configuration`] if `code` is missing after
    /// alias resolution, or the language tag is unrecognized.
    pub fn build(input: ServiceDescriptorInput) -> Result<Self, SpawnMiddlewareError> {
        let code = input
            .code
            .or(input.source)
            .ok_or_else(|| SpawnMiddlewareError::Configuration("missing `code`".to_string()))?;

        let language_tag = input.language.or(input.lang);
        let language = Language::canonicalize(language_tag.as_deref())?;

        let view = input.view.or(input.theme_source);
        let presenter = input.presenter.or(input.presenter_source);

        Ok(Self {
            code,
            language,
            view,
            presenter,
            custom_timeout: input.custom_timeout,
            config: input.config,
            is_hookio: input.is_hookio,
            env: input.env,
            log: input.log,
        })
    }

    /// Per-request code override, keeping every other field immutable.
    #[must_use]
    pub fn with_code(&self, code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..self.clone()
        }
    }

    /// Emit a log line through this service's sink, or the global `log`
    /// facade if none was supplied.
    pub fn log(&self, level: log::Level, msg: &str) {
        match &self.log {
            Some(sink) => sink(level, msg),
            None => log::log!(level, "{msg}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_aliases_resolve() {
        let input = ServiceDescriptorInput {
            source: Some("echo hi".into()),
            lang: Some("coffee".into()),
            theme_source: Some("theme".into()),
            presenter_source: Some("presenter".into()),
            ..Default::default()
        };
        let svc = ServiceDescriptor::build(input).unwrap();
        assert_eq!(svc.code, "echo hi");
        assert_eq!(svc.language, Language::CoffeeScript);
        assert_eq!(svc.view.as_deref(), Some("theme"));
        assert_eq!(svc.presenter.as_deref(), Some("presenter"));
    }

    #[test]
    fn missing_code_is_configuration_error() {
        let err = ServiceDescriptor::build(ServiceDescriptorInput::default()).unwrap_err();
        assert!(matches!(err, SpawnMiddlewareError::Configuration(_)));
    }

    #[test]
    fn code_can_be_overridden_per_request() {
        let svc = ServiceDescriptor::build(ServiceDescriptorInput {
            code: Some("a".into()),
            ..Default::default()
        })
        .unwrap();
        let overridden = svc.with_code("b");
        assert_eq!(overridden.code, "b");
        assert_eq!(overridden.language, svc.language);
    }
}
