use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use thiserror::Error;

/// Placeholder substituted for secret values in anything that gets printed.
pub const REDACTED: &str = "[REDACTED]";

/// A value that must never appear in logs or diagnostics.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value. Only pass this to the process that needs it.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl Serialize for Secret {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(REDACTED)
    }
}

/// Value passed to `expo eject --eject-method`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EjectMethod {
    #[serde(rename = "plain")]
    Plain,
    #[serde(rename = "expoKit")]
    ExpoKit,
}

impl EjectMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            EjectMethod::Plain => "plain",
            EjectMethod::ExpoKit => "expoKit",
        }
    }

    /// Whether ejecting with this method needs an authenticated account.
    pub fn requires_account(&self) -> bool {
        matches!(self, EjectMethod::ExpoKit)
    }
}

impl fmt::Display for EjectMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EjectMethod {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "plain" => Ok(EjectMethod::Plain),
            "expoKit" | "expokit" => Ok(EjectMethod::ExpoKit),
            other => Err(format!(
                "unknown eject method '{other}', expected 'plain' or 'expoKit'"
            )),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("user name is specified but password is not provided")]
    MissingPassword,
    #[error("password is specified but user name is not provided")]
    MissingUserName,
    #[error("project directory does not exist: {0}")]
    MissingProjectDir(PathBuf),
    #[error("Expo CLI version must not be empty")]
    MissingCliVersion,
    #[error("eject method '{0}' requires Expo account credentials")]
    MethodRequiresCredentials(EjectMethod),
}

/// Inputs of a single workflow run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowConfig {
    pub workdir: PathBuf,
    /// A version string or the literal `latest`.
    pub cli_version: String,
    pub user_name: Option<String>,
    pub password: Option<Secret>,
    /// Explicit `--eject-method`; inferred from the credentials when absent.
    pub eject_method: Option<EjectMethod>,
    pub publish: bool,
    pub override_react_native_version: Option<String>,
    /// `Some(false)` keeps the account logged in at the end of the run.
    pub logout: Option<bool>,
}

impl WorkflowConfig {
    pub fn new(workdir: impl Into<PathBuf>, cli_version: impl Into<String>) -> Self {
        Self {
            workdir: workdir.into(),
            cli_version: cli_version.into(),
            user_name: None,
            password: None,
            eject_method: None,
            publish: false,
            override_react_native_version: None,
            logout: None,
        }
    }

    pub fn with_credentials(mut self, user_name: impl Into<String>, password: Secret) -> Self {
        self.user_name = non_empty(Some(user_name.into()));
        self.password = Some(password).filter(|secret| !secret.is_empty());
        self
    }

    /// Credentials as a pair, if both halves are present.
    pub fn credentials(&self) -> Option<(&str, &Secret)> {
        match (self.user_name.as_deref(), self.password.as_ref()) {
            (Some(user), Some(password)) => Some((user, password)),
            _ => None,
        }
    }

    /// Checks run before any external process is spawned.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let has_user = self.user_name.as_deref().is_some_and(|u| !u.is_empty());
        let has_password = self.password.as_ref().is_some_and(|p| !p.is_empty());
        match (has_user, has_password) {
            (true, false) => return Err(ValidationError::MissingPassword),
            (false, true) => return Err(ValidationError::MissingUserName),
            _ => {}
        }

        if self.cli_version.trim().is_empty() {
            return Err(ValidationError::MissingCliVersion);
        }

        if !self.workdir.is_dir() {
            return Err(ValidationError::MissingProjectDir(self.workdir.clone()));
        }

        if let Some(method) = self.eject_method {
            if method.requires_account() && !has_user {
                return Err(ValidationError::MethodRequiresCredentials(method));
            }
        }

        Ok(())
    }

    /// Explicit method if configured, otherwise `expoKit` iff credentials are supplied.
    pub fn resolve_eject_method(&self) -> EjectMethod {
        if let Some(method) = self.eject_method {
            return method;
        }

        if self.credentials().is_some() {
            EjectMethod::ExpoKit
        } else {
            EjectMethod::Plain
        }
    }

    /// Logout is on unless explicitly disabled.
    pub fn logout_enabled(&self) -> bool {
        self.logout.unwrap_or(true)
    }
}

/// Treat empty or whitespace-only inputs as unset.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parses pipeline-style boolean inputs.
pub fn parse_flag(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "true" | "y" | "1" => Ok(true),
        "no" | "false" | "n" | "0" | "" => Ok(false),
        other => Err(format!("expected yes/no or true/false, found '{other}'")),
    }
}
