/*
 * @Author       : 老董
 * @Date         : 2026-02-12
 * @Description  : 在合成条纹数据集上训练 AVB
 *
 * 运行：cargo run --release --example avb_synthetic -- --nsteps 2000 --ntest 200
 *       cargo run --release --example avb_synthetic -- --ac --out-dir runs/ac
 * 采样图片写在 <out-dir>/samples，检查点写在 <out-dir>/logs；同一目录再次运行会接着训练。
 */

use std::path::PathBuf;

use avb::data::{BatchLoader, synthetic};
use avb::model::{CondDist, ContrastEncoder, Encoder, ImplicitEncoder, MlpAdversary, MlpDecoder};
use avb::{AvbResult, TrainConfig, Trainer};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "avb_synthetic", about = "在合成条纹数据集上训练对抗变分贝叶斯模型")]
struct Cli {
    /// JSON 配置文件；给出时下面的训练参数只覆盖其中的对应项
    #[arg(long)]
    config: Option<PathBuf>,
    /// 输出目录（logs/ 与 samples/ 的上级目录）
    #[arg(long, default_value = "runs/avb_synthetic")]
    out_dir: PathBuf,
    #[arg(long)]
    nsteps: Option<usize>,
    #[arg(long)]
    ntest: Option<usize>,
    /// 启用 adaptive contrast
    #[arg(long)]
    ac: bool,
    #[arg(long)]
    seed: Option<u64>,
    /// 图像边长
    #[arg(long, default_value_t = 8)]
    size: usize,
    /// 合成数据集的样本数
    #[arg(long, default_value_t = 2048)]
    samples: usize,
    /// 各网络隐藏层宽度
    #[arg(long, default_value_t = 128)]
    hidden: usize,
    /// 编码器噪声维度
    #[arg(long, default_value_t = 8)]
    noise_dim: usize,
    /// adaptive contrast 下估计均值/方差所用的噪声采样数
    #[arg(long, default_value_t = 8)]
    contrast_samples: usize,
}

fn default_config(cli: &Cli) -> TrainConfig {
    TrainConfig {
        is_ac: cli.ac,
        output_size: cli.size,
        c_dim: 1,
        batch_size: 64,
        cond_dist: CondDist::Bernoulli,
        z_dim: 4,
        z_dist: "gauss".to_string(),
        learning_rate: 1e-4,
        learning_rate_adversary: 2e-4,
        log_dir: cli.out_dir.join("logs"),
        sample_dir: cli.out_dir.clone(),
        nsteps: 2000,
        ntest: 200,
        seed: None,
        save_summaries_secs: 15,
        save_model_secs: 600,
        show_progress: true,
        beta1: 0.5,
    }
}

fn build_config(cli: &Cli) -> AvbResult<TrainConfig> {
    let mut config = match &cli.config {
        Some(path) => TrainConfig::from_json_file(path)?,
        None => default_config(cli),
    };
    if let Some(nsteps) = cli.nsteps {
        config.nsteps = nsteps;
    }
    if let Some(ntest) = cli.ntest {
        config.ntest = ntest;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    config.is_ac |= cli.ac;
    config.validate()?;
    Ok(config)
}

fn run<E: Encoder>(
    mut encoder: E,
    config: TrainConfig,
    cli: &Cli,
    rng: &mut StdRng,
) -> AvbResult<()> {
    let image_shape = config.image_shape();
    let mut decoder = MlpDecoder::new(config.z_dim, &[cli.hidden, cli.hidden], image_shape, rng)?;
    let mut adversary =
        MlpAdversary::new(image_shape, config.z_dim, &[cli.hidden, cli.hidden], rng)?;

    let dataset = synthetic::bars(cli.samples, config.output_size, config.seed.unwrap_or(0));
    let mut loader = BatchLoader::new(dataset, config.batch_size)?.shuffle(true);
    if let Some(seed) = config.seed {
        loader = loader.seed(seed);
    }

    let mut trainer = Trainer::new(config)?;
    let outcome = trainer.train(&mut encoder, &mut decoder, &mut adversary, &mut loader)?;

    if let Some(losses) = outcome.last_losses {
        tracing::info!(
            step = outcome.final_step,
            loss_primal = losses.primal,
            loss_dual = losses.dual,
            reconst_err = losses.reconst_err,
            "训练完成"
        );
    }
    Ok(())
}

fn main() -> AvbResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    if config.c_dim != 1 {
        tracing::warn!(c_dim = config.c_dim, "合成数据集只有单通道，按 c_dim=1 训练");
    }
    let config = TrainConfig { c_dim: 1, ..config };

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let image_shape = config.image_shape();
    let hidden = [cli.hidden, cli.hidden];

    if config.is_ac {
        let encoder = ContrastEncoder::new(
            image_shape,
            config.z_dim,
            cli.noise_dim,
            &hidden,
            cli.contrast_samples,
            &mut rng,
        )?;
        run(encoder, config, &cli, &mut rng)
    } else {
        let encoder =
            ImplicitEncoder::new(image_shape, config.z_dim, cli.noise_dim, &hidden, &mut rng)?;
        run(encoder, config, &cli, &mut rng)
    }
}
