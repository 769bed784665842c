// ABOUTME: Tests for PolicyFacet - batched writes, atomicity, and reads.
// ABOUTME: Each failing batch must leave every element untouched.

use std::sync::Arc;

use tokio_test::assert_ok;

use super::*;
use crate::access::StaticOwners;
use crate::config::RegistryConfig;
use crate::error::{AccessError, ReferenceError, RegistryError, ValidationError};
use crate::registry::Registry;
use crate::state::{Address, ContentHash, KeyEntityId};

const KEY: KeyEntityId = KeyEntityId(1);

fn addr(s: &str) -> Address {
    s.parse().unwrap()
}

fn owner() -> Address {
    addr("0x1")
}

/// Registry with tools A, B, C and delegatees 0xa, 0xb, 0xc.
async fn setup() -> Registry {
    let registry = Registry::new(Arc::new(StaticOwners::new().with_owner(KEY, owner())));
    registry
        .tools()
        .register_tools(owner(), KEY, &["QmA", "QmB", "QmC"], true)
        .await
        .unwrap();
    registry
        .delegatees()
        .add_delegatees(owner(), KEY, &[addr("0xa"), addr("0xb"), addr("0xc")])
        .await
        .unwrap();
    registry
}

async fn custom(registry: &Registry, tool: &str, delegatee: &str) -> PolicyView {
    registry
        .policies()
        .custom_policy(KEY, tool, addr(delegatee))
        .await
        .unwrap()
}

#[tokio::test]
async fn test_set_custom_and_read_back() {
    let registry = setup().await;
    assert_ok!(
        registry
            .policies()
            .set_custom_policies(owner(), KEY, &["QmA"], &[addr("0xa")], &["QmPol"], true)
            .await
    );

    let view = custom(&registry, "QmA", "0xa").await;
    assert_eq!(view.policy_id.as_deref(), Some("QmPol"));
    assert!(view.enabled);
}

#[tokio::test]
async fn test_set_custom_populates_reverse_index() {
    let registry = setup().await;
    registry
        .policies()
        .set_custom_policies(owner(), KEY, &["QmA"], &[addr("0xa")], &["QmPol"], false)
        .await
        .unwrap();

    assert_eq!(
        registry
            .policies()
            .resolve_content_id(&ContentHash::of("QmPol"))
            .await
            .as_deref(),
        Some("QmPol")
    );
}

#[tokio::test]
async fn test_set_custom_zero_delegatee_is_atomic() {
    let registry = setup().await;

    let err = registry
        .policies()
        .set_custom_policies(
            owner(),
            KEY,
            &["QmA", "QmB", "QmC"],
            &[addr("0xa"), Address::ZERO, addr("0xc")],
            &["QmP1", "QmP2", "QmP3"],
            true,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Validation(ValidationError::InvalidDelegatee { index: 1 })
    ));

    assert_eq!(custom(&registry, "QmA", "0xa").await, PolicyView::default());
    assert_eq!(custom(&registry, "QmC", "0xc").await, PolicyView::default());
    assert_eq!(
        registry
            .policies()
            .resolve_content_id(&ContentHash::of("QmP1"))
            .await,
        None
    );
}

#[tokio::test]
async fn test_set_custom_length_mismatch() {
    let registry = setup().await;

    let err = registry
        .policies()
        .set_custom_policies(
            owner(),
            KEY,
            &["QmA", "QmB"],
            &[addr("0xa"), addr("0xb")],
            &["QmP1"],
            true,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Validation(ValidationError::ArrayLengthMismatch {
            expected: 2,
            found: 1
        })
    ));
}

#[tokio::test]
async fn test_empty_tool_list_with_delegatees_is_mismatch() {
    let registry = setup().await;
    let policies = registry.policies();
    let no_tools: [&str; 0] = [];

    let err = policies
        .set_custom_policies(owner(), KEY, &no_tools, &[addr("0xa")], &["QmP1"], true)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Validation(ValidationError::ArrayLengthMismatch {
            expected: 0,
            found: 1
        })
    ));

    let err = policies
        .remove_custom_policies(owner(), KEY, &no_tools, &[addr("0xa")])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Validation(ValidationError::ArrayLengthMismatch { .. })
    ));

    let err = policies
        .disable_custom_policies(owner(), KEY, &no_tools, &[addr("0xa")])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Validation(ValidationError::ArrayLengthMismatch { .. })
    ));

    // Equal but empty inputs are still an empty batch.
    let err = policies
        .remove_custom_policies(owner(), KEY, &no_tools, &[])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Validation(ValidationError::EmptyBatch)
    ));
}

#[tokio::test]
async fn test_set_custom_unknown_tool() {
    let registry = setup().await;

    let err = registry
        .policies()
        .set_custom_policies(
            owner(),
            KEY,
            &["QmA", "QmMissing"],
            &[addr("0xa"), addr("0xa")],
            &["QmP1", "QmP2"],
            true,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Reference(ReferenceError::ToolNotFound { .. })
    ));
    assert_eq!(custom(&registry, "QmA", "0xa").await, PolicyView::default());
}

#[tokio::test]
async fn test_set_custom_unregistered_delegatee() {
    let registry = setup().await;

    let err = registry
        .policies()
        .set_custom_policies(owner(), KEY, &["QmA"], &[addr("0xdead")], &["QmP"], true)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Reference(ReferenceError::DelegateeNotFound { .. })
    ));
}

#[tokio::test]
async fn test_set_custom_empty_policy_id() {
    let registry = setup().await;

    let err = registry
        .policies()
        .set_custom_policies(
            owner(),
            KEY,
            &["QmA", "QmB"],
            &[addr("0xa"), addr("0xb")],
            &["QmP1", ""],
            true,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Validation(ValidationError::EmptyPolicyId { index: 1 })
    ));
    assert_eq!(custom(&registry, "QmA", "0xa").await, PolicyView::default());
}

#[tokio::test]
async fn test_set_custom_requires_owner() {
    let registry = setup().await;

    let err = registry
        .policies()
        .set_custom_policies(addr("0x2"), KEY, &["QmA"], &[addr("0xa")], &["QmP"], true)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Access(AccessError::NotOwner { .. })
    ));
}

#[tokio::test]
async fn test_remove_custom_falls_back_to_blanket() {
    let registry = setup().await;
    let policies = registry.policies();
    policies
        .set_blanket_policies(owner(), KEY, &["QmA"], &["QmBlanket"], true)
        .await
        .unwrap();
    policies
        .set_custom_policies(owner(), KEY, &["QmA"], &[addr("0xa")], &["QmCustom"], true)
        .await
        .unwrap();

    policies
        .remove_custom_policies(owner(), KEY, &["QmA"], &[addr("0xa")])
        .await
        .unwrap();

    let effective = policies
        .effective_policy(KEY, "QmA", addr("0xa"))
        .await
        .unwrap();
    assert_eq!(effective.policy_id.as_deref(), Some("QmBlanket"));
    assert!(!effective.delegatee_specific);
}

#[tokio::test]
async fn test_remove_custom_absent_fails_atomically() {
    let registry = setup().await;
    let policies = registry.policies();
    policies
        .set_custom_policies(owner(), KEY, &["QmA"], &[addr("0xa")], &["QmP"], true)
        .await
        .unwrap();

    let err = policies
        .remove_custom_policies(owner(), KEY, &["QmA", "QmB"], &[addr("0xa"), addr("0xb")])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Reference(ReferenceError::NoPolicySet {
            delegatee: Some(_),
            ..
        })
    ));
    assert_eq!(
        custom(&registry, "QmA", "0xa").await.policy_id.as_deref(),
        Some("QmP")
    );
}

#[tokio::test]
async fn test_remove_custom_duplicate_in_batch_fails() {
    let registry = setup().await;
    let policies = registry.policies();
    policies
        .set_custom_policies(owner(), KEY, &["QmA"], &[addr("0xa")], &["QmP"], true)
        .await
        .unwrap();

    let err = policies
        .remove_custom_policies(owner(), KEY, &["QmA", "QmA"], &[addr("0xa"), addr("0xa")])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Reference(ReferenceError::NoPolicySet { .. })
    ));
    assert!(custom(&registry, "QmA", "0xa").await.policy_id.is_some());
}

#[tokio::test]
async fn test_enable_disable_custom() {
    let registry = setup().await;
    let policies = registry.policies();
    policies
        .set_custom_policies(owner(), KEY, &["QmA"], &[addr("0xa")], &["QmP"], false)
        .await
        .unwrap();
    assert!(!custom(&registry, "QmA", "0xa").await.enabled);

    policies
        .enable_custom_policies(owner(), KEY, &["QmA"], &[addr("0xa")])
        .await
        .unwrap();
    assert!(custom(&registry, "QmA", "0xa").await.enabled);

    policies
        .disable_custom_policies(owner(), KEY, &["QmA"], &[addr("0xa")])
        .await
        .unwrap();
    assert!(!custom(&registry, "QmA", "0xa").await.enabled);
}

#[tokio::test]
async fn test_toggle_absent_custom_is_error() {
    let registry = setup().await;

    let err = registry
        .policies()
        .enable_custom_policies(owner(), KEY, &["QmA"], &[addr("0xa")])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Reference(ReferenceError::NoPolicySet { .. })
    ));

    let err = registry
        .policies()
        .disable_custom_policies(owner(), KEY, &["QmA"], &[Address::ZERO])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Validation(ValidationError::InvalidDelegatee { index: 0 })
    ));
}

#[tokio::test]
async fn test_blanket_lifecycle() {
    let registry = setup().await;
    let policies = registry.policies();

    policies
        .set_blanket_policies(owner(), KEY, &["QmA", "QmB"], &["QmP1", "QmP2"], false)
        .await
        .unwrap();
    let view = policies.blanket_policy(KEY, "QmB").await.unwrap();
    assert_eq!(view.policy_id.as_deref(), Some("QmP2"));
    assert!(!view.enabled);

    policies
        .enable_blanket_policies(owner(), KEY, &["QmA", "QmB"])
        .await
        .unwrap();
    assert!(policies.blanket_policy(KEY, "QmA").await.unwrap().enabled);

    policies
        .disable_blanket_policies(owner(), KEY, &["QmA"])
        .await
        .unwrap();
    assert!(!policies.blanket_policy(KEY, "QmA").await.unwrap().enabled);

    policies
        .remove_blanket_policies(owner(), KEY, &["QmA"])
        .await
        .unwrap();
    assert_eq!(
        policies.blanket_policy(KEY, "QmA").await.unwrap(),
        PolicyView::default()
    );
}

#[tokio::test]
async fn test_blanket_errors() {
    let registry = setup().await;
    let policies = registry.policies();

    let err = policies
        .remove_blanket_policies(owner(), KEY, &["QmA"])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Reference(ReferenceError::NoPolicySet {
            delegatee: None,
            ..
        })
    ));

    let err = policies
        .set_blanket_policies(owner(), KEY, &["QmA"], &[""], true)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Validation(ValidationError::EmptyPolicyId { index: 0 })
    ));

    let err = policies
        .set_blanket_policies(owner(), KEY, &["QmA", "QmB"], &["QmP"], true)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Validation(ValidationError::ArrayLengthMismatch { .. })
    ));
}

#[tokio::test]
async fn test_reads_on_unknown_tool() {
    let registry = setup().await;
    let policies = registry.policies();

    for delegatee in [Address::ZERO, addr("0xa"), addr("0xffff")] {
        let err = policies
            .effective_policy(KEY, "QmMissing", delegatee)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::Reference(ReferenceError::ToolNotFound { .. })
        ));
    }
    assert!(policies.custom_policy(KEY, "QmMissing", addr("0xa")).await.is_err());
    assert!(policies.blanket_policy(KeyEntityId(42), "QmA").await.is_err());
}

#[tokio::test]
async fn test_effective_policy_ignores_tool_enabled_flag() {
    let registry = setup().await;
    registry
        .policies()
        .set_blanket_policies(owner(), KEY, &["QmA"], &["QmBlanket"], true)
        .await
        .unwrap();
    registry
        .tools()
        .disable_tools(owner(), KEY, &["QmA"])
        .await
        .unwrap();

    let effective = registry
        .policies()
        .effective_policy(KEY, "QmA", addr("0xa"))
        .await
        .unwrap();
    assert_eq!(effective.policy_id.as_deref(), Some("QmBlanket"));
}

#[tokio::test]
async fn test_authorize_execution() {
    let registry = setup().await;
    let policies = registry.policies();
    policies
        .set_custom_policies(owner(), KEY, &["QmA"], &[addr("0xa")], &["QmCustom"], true)
        .await
        .unwrap();

    let granted = policies
        .authorize_execution(KEY, "QmA", addr("0xa"))
        .await
        .unwrap();
    assert_eq!(granted.policy_id.as_deref(), Some("QmCustom"));
    assert!(granted.delegatee_specific);

    let err = policies
        .authorize_execution(KEY, "QmA", addr("0xdead"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Reference(ReferenceError::DelegateeNotFound { .. })
    ));

    registry
        .tools()
        .disable_tools(owner(), KEY, &["QmA"])
        .await
        .unwrap();
    let err = policies
        .authorize_execution(KEY, "QmA", addr("0xa"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Reference(ReferenceError::ToolDisabled { .. })
    ));
}

#[tokio::test]
async fn test_batch_limit() {
    let registry = Registry::builder(Arc::new(StaticOwners::new().with_owner(KEY, owner())))
        .config(RegistryConfig::builder().max_batch_size(1).build())
        .build();
    for tool in ["QmA", "QmB"] {
        registry
            .tools()
            .register_tools(owner(), KEY, &[tool], true)
            .await
            .unwrap();
    }

    let err = registry
        .policies()
        .set_blanket_policies(owner(), KEY, &["QmA", "QmB"], &["QmP1", "QmP2"], true)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Validation(ValidationError::BatchTooLarge { size: 2, limit: 1 })
    ));
}
