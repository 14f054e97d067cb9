//! Request intake: checks run before a job is queued

use mazepath_types::{Component, SolveRequest};
use tracing::{debug, warn};

use crate::error::InputError;

/// Normalize a request's components
///
/// A component that cannot be normalized becomes `None` and is answered
/// with an empty path; the request is only rejected when nothing usable
/// remains.
pub fn check_request(request: &SolveRequest) -> Result<Vec<Option<Component>>, InputError> {
    let raw = request
        .components
        .as_ref()
        .ok_or(InputError::MissingComponents)?;
    if raw.is_empty() {
        return Err(InputError::EmptyComponents);
    }

    let components: Vec<Option<Component>> = raw
        .iter()
        .enumerate()
        .map(|(index, value)| match Component::normalize(value) {
            Ok(component) => Some(component),
            Err(e) => {
                warn!(index = index, error = %e, "Dropping component that cannot be normalized");
                None
            }
        })
        .collect();

    let usable = components.iter().filter(|c| c.is_some()).count();
    if usable == 0 {
        return Err(InputError::NoUsableComponents(raw.len()));
    }

    debug!(components = raw.len(), usable = usable, "Request passed intake");
    Ok(components)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(components: serde_json::Value) -> SolveRequest {
        serde_json::from_value(json!({ "components": components })).unwrap()
    }

    #[test]
    fn test_missing_components() {
        assert_eq!(
            check_request(&SolveRequest::default()),
            Err(InputError::MissingComponents)
        );
    }

    #[test]
    fn test_empty_components() {
        assert_eq!(check_request(&request(json!([]))), Err(InputError::EmptyComponents));
    }

    #[test]
    fn test_flat_list_is_dropped_not_fatal() {
        let components = check_request(&request(json!([{"1": ["2"]}, ["a", "b", "c"]]))).unwrap();

        assert_eq!(components.len(), 2);
        assert_eq!(components[0].as_ref().map(Component::node_count), Some(2));
        assert!(components[1].is_none());
    }

    #[test]
    fn test_nothing_usable_is_rejected() {
        assert_eq!(
            check_request(&request(json!([["a", "b", "c"], "junk"]))),
            Err(InputError::NoUsableComponents(2))
        );
    }

    #[test]
    fn test_edge_list_is_accepted() {
        let components = check_request(&request(json!([[[1, 2], [2, 3]]]))).unwrap();

        assert_eq!(components[0].as_ref().map(Component::edge_count), Some(2));
    }
}
