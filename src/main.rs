use lesson_narrator::domain::narration::{BatchSummary, NarrationService, NarrationServiceApi};
use lesson_narrator::error::{AppError, AppResult};
use lesson_narrator::infrastructure::config::{Config, LogFormat, TtsProvider};
use lesson_narrator::infrastructure::repositories::{
    into_requests, ElevenLabsTtsRepository, GoogleTtsRepository, LessonRepository, Manifest,
    ManifestRepository, OpenAiTtsRepository, PollyTtsRepository, TtsRepository, VoiceDefaults,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        tracing::error!(error = %err, "Narration batch aborted");
        eprintln!("error: {}", err);
        std::process::exit(err.exit_code());
    }
}

async fn run() -> AppResult<()> {
    // Load configuration
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            // Logging is not configured yet
            init_logging(&LogFormat::Pretty);
            return Err(err);
        }
    };

    // Initialize logging
    init_logging(&config.log_format);

    tracing::info!(
        provider = %config.provider,
        lessons_file = %config.lessons_file.display(),
        output_root = %config.output_root.display(),
        "Starting lesson narrator"
    );

    // Load lesson data
    let lessons = LessonRepository::new(config.lessons_file.clone())
        .load(config.lesson_ids.as_deref())
        .await?;
    let requests = into_requests(lessons, &VoiceDefaults::from(&config))?;

    if config.provider == TtsProvider::Google {
        let adjusted = requests
            .iter()
            .filter(|r| !r.voice().rate.is_default())
            .count();
        if adjusted > 0 {
            tracing::warn!(
                items = adjusted,
                "Google TTS has no rate control; speech rates will be ignored"
            );
        }
    }

    // === DEPENDENCY INJECTION SETUP ===
    let tts_repo = build_tts_repository(&config).await?;
    let service = NarrationService::new(
        tts_repo,
        config.output_root.clone(),
        config.generator_options(),
    );

    service.prepare_output_root().await?;

    let results = service.generate(requests).await;
    let summary = BatchSummary::from_results(&results);
    println!("{}", summary);

    if config.write_manifest {
        let manifest = Manifest::from_results(service.provider(), service.output_root(), &results);
        if let Err(err) = ManifestRepository::new(config.output_root.clone())
            .save(&manifest)
            .await
        {
            tracing::warn!(error = %err, "Could not write manifest");
        }
    }

    Ok(())
}

async fn build_tts_repository(config: &Config) -> AppResult<Arc<dyn TtsRepository>> {
    let repo: Arc<dyn TtsRepository> = match config.provider {
        TtsProvider::Google => {
            let client = build_http_client()?;
            Arc::new(GoogleTtsRepository::new(client, config.google_base_url.clone()))
        }
        TtsProvider::Polly => {
            tracing::info!("Initializing AWS Polly client with region: {}", config.aws_region);

            let has_access_key = std::env::var("AWS_ACCESS_KEY_ID").is_ok();
            let has_secret_key = std::env::var("AWS_SECRET_ACCESS_KEY").is_ok();
            if !has_access_key || !has_secret_key {
                tracing::warn!("AWS credentials not found in environment variables. Will attempt to use other credential providers (profile, instance metadata, etc.)");
            }

            let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(aws_config::Region::new(config.aws_region.clone()))
                .load()
                .await;

            tracing::info!(region = ?aws_config.region(), "AWS configuration loaded");

            let polly_client = aws_sdk_polly::Client::new(&aws_config);
            Arc::new(PollyTtsRepository::new(Arc::new(polly_client)))
        }
        TtsProvider::OpenAi => {
            let api_key = config.openai_api_key.clone().ok_or_else(|| {
                AppError::Config("OPENAI_API_KEY is required for the openai provider".to_string())
            })?;
            let openai_config = async_openai::config::OpenAIConfig::new().with_api_key(api_key);
            let client = async_openai::Client::with_config(openai_config);
            Arc::new(OpenAiTtsRepository::new(
                Arc::new(client),
                config.openai_model.clone(),
            ))
        }
        TtsProvider::ElevenLabs => {
            let api_key = config.elevenlabs_api_key.clone().ok_or_else(|| {
                AppError::Config(
                    "ELEVENLABS_API_KEY is required for the elevenlabs provider".to_string(),
                )
            })?;
            Arc::new(ElevenLabsTtsRepository::new(
                build_http_client()?,
                config.elevenlabs_base_url.clone(),
                api_key,
                config.elevenlabs_model.clone(),
            ))
        }
    };

    tracing::info!(provider = repo.provider(), "TTS backend initialized");
    Ok(repo)
}

fn build_http_client() -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("lesson-narrator/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AppError::Backend(format!("failed to build HTTP client: {}", e)))
}

fn init_logging(format: &LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "lesson_narrator=info".into());

    if *format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
