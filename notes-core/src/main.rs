use notes_core::{
    config,
    notes::{NoteStore, SqliteNotes},
    LazyDb, Result,
};
use tracing_subscriber::prelude::*;

fn setup_tracing(json: bool) {
    let tracing = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "notes_core=debug".into()),
    );

    if json {
        tracing.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        tracing
            .with(
                tracing_subscriber::fmt::layer()
                    .compact()
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(false),
            )
            .init();
    };
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = config();
    setup_tracing(config.as_ref().is_ok_and(|config| config.log_json));

    let config = config.inspect_err(|error| tracing::error!("invalid NOTES_* environment: {error:?}"))?;

    let store = NoteStore::new(SqliteNotes::new(LazyDb::new(&config.database_url)));

    let count = match store.load().await {
        Ok(count) => count,
        Err(error) => {
            tracing::error!("cannot open notes at {}: {error:?}", config.database_url);
            return Err(error);
        }
    };
    tracing::info!("loaded {count} notes from {}", config.database_url);

    for note in store.notes().iter() {
        tracing::debug!(
            id = %note.id(),
            updated_at = %note.updated_at(),
            tags = note.tags().len(),
            image = ?note.image().preferred(config.image_storage).map(|_| "attached"),
            "{}",
            note.title()
        );
    }

    Ok(())
}
