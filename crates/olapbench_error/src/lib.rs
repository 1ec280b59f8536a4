use std::backtrace::{Backtrace, BacktraceStatus};
use std::borrow::Cow;
use std::error::Error;
use std::fmt;

pub type Result<T, E = BenchError> = std::result::Result<T, E>;

/// Error type used throughout the benchmark crates.
///
/// Carries a message, an optional source error, and any number of extra
/// fields that get printed alongside the message. Fields are useful for
/// attaching things like captured process output without baking it into the
/// message itself.
pub struct BenchError {
    inner: Box<BenchErrorInner>,
}

struct BenchErrorInner {
    msg: String,
    source: Option<Box<dyn Error + Send + Sync>>,
    fields: Vec<ErrorField>,
    backtrace: Backtrace,
}

struct ErrorField {
    key: Cow<'static, str>,
    value: Box<dyn fmt::Display + Send + Sync>,
}

impl BenchError {
    pub fn new(msg: impl Into<String>) -> Self {
        BenchError {
            inner: Box::new(BenchErrorInner {
                msg: msg.into(),
                source: None,
                fields: Vec::new(),
                backtrace: Backtrace::capture(),
            }),
        }
    }

    pub fn with_source(msg: impl Into<String>, source: Box<dyn Error + Send + Sync>) -> Self {
        let mut err = Self::new(msg);
        err.inner.source = Some(source);
        err
    }

    /// Attach a field to this error.
    pub fn with_field<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<Cow<'static, str>>,
        V: fmt::Display + Send + Sync + 'static,
    {
        self.inner.fields.push(ErrorField {
            key: key.into(),
            value: Box::new(value),
        });
        self
    }

    pub fn get_msg(&self) -> &str {
        &self.inner.msg
    }

    /// Get the display value of a field, if the field exists.
    ///
    /// If a key was added multiple times, the first one is returned.
    pub fn get_field(&self, key: &str) -> Option<String> {
        self.inner
            .fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.value.to_string())
    }

    pub fn get_backtrace(&self) -> &Backtrace {
        &self.inner.backtrace
    }
}

impl fmt::Display for BenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.msg)?;

        for field in &self.inner.fields {
            write!(f, "\n  {}: {}", field.key, field.value)?;
        }

        if let Some(source) = &self.inner.source {
            write!(f, "\nError source: {source}")?;
        }

        if self.inner.backtrace.status() == BacktraceStatus::Captured {
            write!(f, "\nBacktrace: {}", self.inner.backtrace)?;
        }

        Ok(())
    }
}

impl fmt::Debug for BenchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self}")
    }
}

impl Error for BenchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.inner.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<std::io::Error> for BenchError {
    fn from(value: std::io::Error) -> Self {
        BenchError::with_source("IO error", Box::new(value))
    }
}

impl From<fmt::Error> for BenchError {
    fn from(value: fmt::Error) -> Self {
        BenchError::with_source("Format error", Box::new(value))
    }
}

pub trait ResultExt<T, E> {
    /// Wrap an error with a static context string.
    fn context(self, msg: &'static str) -> Result<T>;

    /// Wrap an error with a context string generated from a function.
    fn context_fn<F>(self, f: F) -> Result<T>
    where
        F: Fn() -> String;
}

impl<T, E: Error + Send + Sync + 'static> ResultExt<T, E> for std::result::Result<T, E> {
    fn context(self, msg: &'static str) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(BenchError::with_source(msg, Box::new(e))),
        }
    }

    fn context_fn<F>(self, f: F) -> Result<T>
    where
        F: Fn() -> String,
    {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(BenchError::with_source(f(), Box::new(e))),
        }
    }
}

pub trait OptionExt<T> {
    /// Return an error if the option is None.
    fn required(self, msg: &'static str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn required(self, msg: &'static str) -> Result<T> {
        match self {
            Some(v) => Ok(v),
            None => Err(BenchError::new(format!("Missing required value: {msg}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_fields_in_order() {
        let err = BenchError::new("process failed")
            .with_field("status", 2)
            .with_field("stderr", "boom");

        let s = err.to_string();
        assert!(s.starts_with("process failed\n  status: 2\n  stderr: boom"));
    }

    #[test]
    fn get_field() {
        let err = BenchError::new("msg").with_field("status", "exit status: 1");
        assert_eq!(Some("exit status: 1".to_string()), err.get_field("status"));
        assert_eq!(None, err.get_field("stdout"));
    }

    #[test]
    fn context_keeps_source() {
        let res: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::other("inner"));
        let err = res.context("outer").unwrap_err();

        assert_eq!("outer", err.get_msg());
        assert_eq!("inner", err.source().unwrap().to_string());
    }

    #[test]
    fn required_none() {
        let err = None::<i32>.required("password").unwrap_err();
        assert_eq!("Missing required value: password", err.get_msg());
    }
}
