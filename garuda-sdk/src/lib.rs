//! # Garuda SDK
//!
//! The domain entity contract a Garuda server is generic over, plus the
//! process-wide registry ("SDK Library") that resolves REST names to entity
//! factories.
//!
//! A production deployment generates this crate's equivalent from a domain
//! model description (entities, relationships, validation rules) and
//! registers it into [`registry::global`] at startup. This crate ships a
//! small reference SDK under [`entities`] used by the server crate's test
//! harness and by its bundled storage/permissions plugin examples.

pub mod entities;
pub mod entity;
pub mod error;
pub mod error_list;
pub mod registry;

pub use entity::{Entity, EntityInstance, FetcherMetadata, RelationKind};
pub use error::SdkError;
pub use error_list::{ApiError, ErrorList, ErrorType};
pub use registry::{SdkBundle, SdkLibrary};

#[cfg(test)]
mod tests {
    use super::*;
    use entities::reference_bundle;

    #[test]
    fn reference_bundle_resolves_registered_types() {
        let bundle = reference_bundle();
        assert!(bundle.has("rootuser"));
        assert!(bundle.has("enterprise"));
        assert!(bundle.has("domain"));
        assert!(bundle.instantiate("nonexistent").is_err());
    }

    #[test]
    fn instantiated_entity_starts_with_no_id() {
        let bundle = reference_bundle();
        let user = bundle.instantiate("rootuser").unwrap();
        assert_eq!(user.id(), None);
        assert_eq!(user.rest_name(), "rootuser");
    }

    #[test]
    fn validate_reports_missing_required_fields() {
        let bundle = reference_bundle();
        let enterprise = bundle.instantiate("enterprise").unwrap();
        let mut errors = ErrorList::new();
        enterprise.validate(&mut errors);
        assert!(errors.has_errors());
        assert_eq!(errors.error_type(), Some(ErrorType::Invalid));
    }

    #[test]
    fn rest_equals_detects_identical_content() {
        let bundle = reference_bundle();
        let mut a = bundle.instantiate("domain").unwrap();
        let mut b = bundle.instantiate("domain").unwrap();
        a.from_dict(&serde_json::json!({"name": "dc1", "CIDR": "10.0.0.0/8"}))
            .unwrap();
        b.from_dict(&serde_json::json!({"name": "dc1", "CIDR": "10.0.0.0/8"}))
            .unwrap();
        assert!(a.rest_equals(b.as_ref()));
        b.from_dict(&serde_json::json!({"name": "dc2"})).unwrap();
        assert!(!a.rest_equals(b.as_ref()));
    }

    #[test]
    fn global_library_registers_default_bundle() {
        let library = SdkLibrary::new("reference");
        library.register_bundle(reference_bundle());
        let resolved = library.instantiate("rootuser");
        assert!(resolved.is_ok());
    }
}
