#![cfg(feature = "serde")]

use mlp_kernel::{Activation, Loss, Optimizer, Task, TrainConfig};

#[test]
fn optimizer_uses_a_kind_tag() {
    let json = serde_json::to_string(&Optimizer::Nesterov { momentum: 0.9 }).unwrap();
    assert_eq!(json, r#"{"kind":"nesterov","momentum":0.9}"#);

    let parsed: Optimizer = serde_json::from_str(r#"{"kind":"sgd"}"#).unwrap();
    assert_eq!(parsed, Optimizer::Sgd);
}

#[test]
fn selectors_are_snake_case_strings() {
    assert_eq!(serde_json::to_string(&Activation::Relu).unwrap(), r#""relu""#);
    assert_eq!(
        serde_json::to_string(&Task::Classification).unwrap(),
        r#""classification""#
    );
    let loss: Loss = serde_json::from_str(r#""squared_error""#).unwrap();
    assert_eq!(loss, Loss::SquaredError);
}

#[test]
fn train_config_fills_missing_fields_with_defaults() {
    let cfg: TrainConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(cfg, TrainConfig::default());

    let cfg: TrainConfig = serde_json::from_str(r#"{"lambda":0.25}"#).unwrap();
    assert_eq!(cfg.lambda, 0.25);
    assert!(cfg.validate().is_ok());
}
