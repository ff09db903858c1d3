use std::env;

use anyhow::Context;
use coursekit::api::ApiClient;
use coursekit::content::LessonBody;
use coursekit::sync::load_course;

const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

pub struct Config {
    pub course_id: String,
    pub base_url: String,
    pub token: Option<String>,
}

fn parse_config(mut args: impl Iterator<Item = String>) -> anyhow::Result<Config> {
    let course_id = args.next().context("course_id is required")?;
    let base_url =
        env::var("COURSEKIT_API_URL").context("COURSEKIT_API_URL must be set (see .env)")?;
    let token = env::var("COURSEKIT_API_TOKEN").ok();

    Ok(Config {
        course_id,
        base_url,
        token,
    })
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match parse_config(env::args().skip(1)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Usage: coursekit <course_id>");
            return Err(e);
        }
    };

    let client = ApiClient::new(&config.base_url, config.token);
    let (meta, model) = load_course(&client, &config.course_id)
        .context(format!("could not load course {}", config.course_id))?;

    println!(
        "{BOLD}{}{RESET} [{}] {}",
        meta.title,
        meta.category,
        if meta.published { "published" } else { "draft" }
    );

    for lesson in model.lessons() {
        match &lesson.body {
            LessonBody::Text(text) => {
                println!(
                    "  {:>2}. {} ({} attachments)",
                    lesson.order,
                    text.title,
                    text.attachments.len()
                );
            }
            LessonBody::Quiz(quiz) => {
                println!(
                    "  {:>2}. {} [quiz, {} questions, {} min]",
                    lesson.order,
                    quiz.title,
                    quiz.questions.len(),
                    quiz.duration_minutes.unwrap_or(0)
                );
            }
        }
    }

    println!(
        "\nloaded {BOLD}{}{RESET} lessons from {}",
        model.lessons().len(),
        config.base_url
    );

    Ok(())
}
