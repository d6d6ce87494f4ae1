#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Service configuration, read once from the environment at startup.

use std::{fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use crate::{
    payload::{IdField, PayloadSchema},
    prompt::{PromptTemplate, STUDENT_TEMPLATE, TEACHER_TEMPLATE, TemplateError},
};

/// Default upstream deadline.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Errors that stop the service from starting.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// No API credential was provided for the upstream.
    #[error("Missing {0}: set it (or IMAGI_API_KEY) to the upstream API key")]
    MissingCredential(&'static str),
    /// A variable is set to a value that cannot be used.
    #[error("Invalid value `{value}` for {var}: {reason}")]
    Invalid {
        /// Variable name
        var:    &'static str,
        /// Offending value
        value:  String,
        /// What was expected
        reason: String,
    },
}

/// Which text-generation API to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// OpenAI chat completions
    OpenAi,
    /// Google Gemini
    Gemini,
}

impl Provider {
    /// Model used when `IMAGI_MODEL` is unset.
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-4o-mini",
            Provider::Gemini => "gemini-2.5-flash",
        }
    }
}

impl Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::OpenAi => f.write_str("openai"),
            Provider::Gemini => f.write_str("gemini"),
        }
    }
}

impl FromStr for Provider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "gpt" => Ok(Provider::OpenAi),
            "gemini" => Ok(Provider::Gemini),
            other => Err(format!("expected `openai` or `gemini`, got `{other}`")),
        }
    }
}

/// Deployment presets, one per endpoint the relay has historically exposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    /// `POST /grade` on OpenAI, identity in `student_id`, no task
    Grade,
    /// `POST /grade_gemini` on Gemini, identity in `user_id`, task required
    GradeGemini,
    /// `POST /imagi_gpt` on OpenAI with the student-facing prompt
    #[default]
    ImagiGpt,
}

impl Variant {
    /// Route the grading endpoint is mounted on.
    pub fn route(&self) -> &'static str {
        match self {
            Variant::Grade => "/grade",
            Variant::GradeGemini => "/grade_gemini",
            Variant::ImagiGpt => "/imagi_gpt",
        }
    }

    /// Upstream provider.
    pub fn provider(&self) -> Provider {
        match self {
            Variant::Grade | Variant::ImagiGpt => Provider::OpenAi,
            Variant::GradeGemini => Provider::Gemini,
        }
    }

    /// Environment variable holding the API credential.
    pub fn credential_var(&self) -> &'static str {
        match self {
            Variant::Grade => "GRADER_OPENAI_API_KEY",
            Variant::GradeGemini => "GRADER_GEMINI_API_KEY",
            Variant::ImagiGpt => "IMAGI_OPENAI_API_KEY",
        }
    }

    /// Request schema.
    pub fn schema(&self) -> PayloadSchema {
        match self {
            Variant::Grade => PayloadSchema {
                id_field:     IdField::StudentId,
                require_task: false,
            },
            Variant::GradeGemini | Variant::ImagiGpt => PayloadSchema {
                id_field:     IdField::UserId,
                require_task: true,
            },
        }
    }

    /// Embedded prompt template text.
    pub fn template(&self) -> &'static str {
        match self {
            Variant::Grade | Variant::GradeGemini => TEACHER_TEMPLATE,
            Variant::ImagiGpt => STUDENT_TEMPLATE,
        }
    }

    /// Name as accepted by `IMAGI_VARIANT`.
    pub fn name(&self) -> &'static str {
        match self {
            Variant::Grade => "grade",
            Variant::GradeGemini => "grade_gemini",
            Variant::ImagiGpt => "imagi_gpt",
        }
    }
}

impl Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grade" => Ok(Variant::Grade),
            "grade_gemini" => Ok(Variant::GradeGemini),
            "imagi_gpt" => Ok(Variant::ImagiGpt),
            other => Err(format!(
                "expected `grade`, `grade_gemini` or `imagi_gpt`, got `{other}`"
            )),
        }
    }
}

/// Everything needed to talk to the upstream API.
#[derive(Clone)]
pub struct UpstreamSettings {
    /// Which API to call
    pub provider:    Provider,
    /// API credential
    pub api_key:     String,
    /// Base URL override
    pub api_base:    Option<String>,
    /// Model identifier
    pub model:       String,
    /// Optional temperature override (OpenAI only)
    pub temperature: Option<f32>,
    /// Optional top-p override (OpenAI only)
    pub top_p:       Option<f32>,
    /// Deadline for the single outbound call
    pub timeout:     Duration,
}

impl std::fmt::Debug for UpstreamSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamSettings")
            .field("provider", &self.provider)
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Preset the other values default from
    pub variant:       Variant,
    /// Bind host
    pub host:          String,
    /// Bind port
    pub port:          u16,
    /// Route of the grading endpoint
    pub route:         String,
    /// Request schema
    pub schema:        PayloadSchema,
    /// Whether feedback text is trimmed
    pub trim_feedback: bool,
    /// External template file replacing the embedded one
    pub template_path: Option<PathBuf>,
    /// Upstream API settings
    pub upstream:      UpstreamSettings,
}

impl ServiceConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to its
    /// value. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        let variant = parse_var::<Variant, _>(&get, "IMAGI_VARIANT")?.unwrap_or_default();
        let provider =
            parse_var::<Provider, _>(&get, "IMAGI_PROVIDER")?.unwrap_or(variant.provider());

        // The variant's credential only applies to the variant's own provider.
        let credential_var = if provider == variant.provider() {
            variant.credential_var()
        } else {
            "IMAGI_API_KEY"
        };
        let api_key = get("IMAGI_API_KEY")
            .or_else(|| get(credential_var))
            .ok_or(ConfigError::MissingCredential(credential_var))?;

        let mut schema = variant.schema();
        if let Some(id_field) = parse_var::<IdField, _>(&get, "IMAGI_ID_FIELD")? {
            schema.id_field = id_field;
        }
        if let Some(require_task) = parse_bool(&get, "IMAGI_REQUIRE_TASK")? {
            schema.require_task = require_task;
        }

        let route = get("IMAGI_ROUTE").unwrap_or_else(|| variant.route().to_string());
        if let Err(reason) = check_route(&route) {
            return Err(ConfigError::Invalid {
                var:    "IMAGI_ROUTE",
                value:  route,
                reason,
            });
        }

        let timeout_secs = parse_var::<u64, _>(&get, "IMAGI_UPSTREAM_TIMEOUT_SECS")?
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var:    "IMAGI_UPSTREAM_TIMEOUT_SECS",
                value:  "0".into(),
                reason: "the upstream deadline must be at least one second".into(),
            });
        }

        let upstream = UpstreamSettings {
            provider,
            api_key,
            api_base: get("IMAGI_API_BASE"),
            model: get("IMAGI_MODEL").unwrap_or_else(|| provider.default_model().to_string()),
            temperature: parse_var(&get, "IMAGI_TEMPERATURE")?,
            top_p: parse_var(&get, "IMAGI_TOP_P")?,
            timeout: Duration::from_secs(timeout_secs),
        };

        Ok(Self {
            variant,
            host: get("IMAGI_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_var(&get, "IMAGI_PORT")?.unwrap_or(8000),
            route,
            schema,
            trim_feedback: parse_bool(&get, "IMAGI_TRIM_FEEDBACK")?.unwrap_or(true),
            template_path: get("IMAGI_PROMPT_TEMPLATE").map(PathBuf::from),
            upstream,
        })
    }

    /// Loads the prompt template: the external file if configured, otherwise
    /// the variant's embedded one.
    pub fn prompt_template(&self) -> Result<PromptTemplate, TemplateError> {
        match &self.template_path {
            Some(path) => PromptTemplate::from_file(path),
            None => PromptTemplate::new(self.variant.template()),
        }
    }

    /// Socket address string to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parses an optional variable with `FromStr`.
fn parse_var<T, G>(get: &G, var: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    G: Fn(&str) -> Option<String>,
{
    get(var)
        .map(|value| {
            value.parse::<T>().map_err(|e| ConfigError::Invalid {
                var,
                value: value.clone(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

/// Rejects routes the router cannot register as a plain literal path.
fn check_route(route: &str) -> Result<(), String> {
    if !route.starts_with('/') {
        return Err("routes must start with `/`".into());
    }
    if route.contains(['{', '}']) {
        return Err("routes must not contain path parameters".into());
    }
    if route.split('/').any(|segment| segment.starts_with([':', '*'])) {
        return Err("route segments must not start with `:` or `*`".into());
    }
    Ok(())
}

/// Parses an optional boolean flag.
fn parse_bool<G>(get: &G, var: &'static str) -> Result<Option<bool>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    get(var)
        .map(|value| match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid {
                var,
                value,
                reason: "expected true or false".into(),
            }),
        })
        .transpose()
}
