/*
 * @Author       : 老董
 * @Date         : 2026-02-10
 * @Description  : 训练配置测试
 */

use crate::config::TrainConfig;
use crate::errors::AvbError;
use crate::model::{CondDist, LatentMode};

const MINIMAL_JSON: &str = r#"{
    "is_ac": false,
    "output_size": 8,
    "c_dim": 1,
    "batch_size": 4,
    "cond_dist": "bernoulli",
    "z_dim": 2,
    "z_dist": "gauss",
    "learning_rate": 1e-4,
    "learning_rate_adversary": 2e-4,
    "log_dir": "logs/run",
    "sample_dir": "samples/run",
    "nsteps": 3,
    "ntest": 1
}"#;

#[test]
fn test_parse_minimal_config_uses_defaults() {
    let config = TrainConfig::from_json_str(MINIMAL_JSON).unwrap();
    assert_eq!(config.batch_size, 4);
    assert_eq!(config.cond_dist, CondDist::Bernoulli);
    assert_eq!(config.seed, None);
    assert_eq!(config.save_summaries_secs, 15);
    assert_eq!(config.save_model_secs, 600);
    assert!(config.show_progress);
    assert_eq!(config.beta1, 0.5);
    assert_eq!(config.latent_mode(), LatentMode::Plain);
    assert_eq!(config.samples_dir(), std::path::Path::new("samples/run/samples"));
}

#[test]
fn test_factor_normalizes_per_pixel_channel() {
    let mut config = TrainConfig::from_json_str(MINIMAL_JSON).unwrap();
    assert_eq!(config.factor(), 1.0 / 64.0);
    config.output_size = 4;
    config.c_dim = 3;
    assert_eq!(config.factor(), 1.0 / 48.0);
    assert_eq!(config.image_shape(), [4, 4, 3]);
}

#[test]
fn test_missing_required_key_is_json_error() {
    let json = MINIMAL_JSON.replace("\"ntest\": 1", "\"unused\": 1");
    let err = TrainConfig::from_json_str(&json).unwrap_err();
    assert!(matches!(err, AvbError::Json(_)));
}

#[test]
fn test_zero_ntest_is_rejected() {
    let json = MINIMAL_JSON.replace("\"ntest\": 1", "\"ntest\": 0");
    let err = TrainConfig::from_json_str(&json).unwrap_err();
    assert!(matches!(err, AvbError::InvalidConfig(_)));
}

#[test]
fn test_unknown_prior_name_still_parses() {
    // 先验名称的检查推迟到构建先验时（报 NotImplemented 而不是配置错误）
    let json = MINIMAL_JSON.replace("\"gauss\"", "\"uniform\"");
    let config = TrainConfig::from_json_str(&json).unwrap();
    assert_eq!(config.z_dist, "uniform");
}

#[test]
fn test_is_ac_selects_contrast_mode() {
    let json = MINIMAL_JSON.replace("\"is_ac\": false", "\"is_ac\": true");
    let config = TrainConfig::from_json_str(&json).unwrap();
    assert_eq!(config.latent_mode(), LatentMode::Contrast);
}
