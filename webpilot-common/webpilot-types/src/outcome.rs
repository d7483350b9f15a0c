use serde::{Deserialize, Serialize};

/// Per-item result of a batch: either the value or the captured error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome<T, E> {
    Success { value: T },
    Failure { error: E },
}

impl<T, E> Outcome<T, E> {
    pub fn success(value: T) -> Self {
        Self::Success { value }
    }

    pub fn failure(error: E) -> Self {
        Self::Failure { error }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Success { value } => Some(value),
            Self::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&E> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error } => Some(error),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Outcome<U, E> {
        match self {
            Self::Success { value } => Outcome::Success { value: f(value) },
            Self::Failure { error } => Outcome::Failure { error },
        }
    }

    pub fn map_err<G, F: FnOnce(E) -> G>(self, f: F) -> Outcome<T, G> {
        match self {
            Self::Success { value } => Outcome::Success { value },
            Self::Failure { error } => Outcome::Failure { error: f(error) },
        }
    }

    pub fn into_result(self) -> Result<T, E> {
        match self {
            Self::Success { value } => Ok(value),
            Self::Failure { error } => Err(error),
        }
    }
}

impl<T, E> From<Result<T, E>> for Outcome<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Self::Success { value },
            Err(error) => Self::Failure { error },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_result() {
        let ok: Outcome<u32, String> = Ok(7).into();
        assert!(ok.is_success());
        assert_eq!(ok.value(), Some(&7));

        let err: Outcome<u32, String> = Err("boom".to_string()).into();
        assert!(err.is_failure());
        assert_eq!(err.error().map(String::as_str), Some("boom"));
    }

    #[test]
    fn test_serialized_shape() {
        let ok: Outcome<u32, String> = Outcome::success(1);
        let json = serde_json::to_value(&ok).unwrap();
        assert_eq!(json, serde_json::json!({"status": "success", "value": 1}));

        let err: Outcome<u32, String> = Outcome::failure("element not found".into());
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": "failure", "error": "element not found"})
        );
    }

    #[test]
    fn test_map_err_keeps_success() {
        let ok: Outcome<u32, u8> = Outcome::success(3);
        assert_eq!(ok.map_err(|e| e.to_string()).into_result(), Ok(3));
    }
}
