use sovran_datastore::{
    facade, Color, DataCallback, DataConfig, DataError, DataState, SearchCase, ValueKind, Vector2,
};
use tracing_subscriber::EnvFilter;

/// Demonstrates keeping game settings and progress in the global container
#[tokio::main]
async fn main() -> Result<(), DataError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Keep demo files out of the real data directory
    let dir = std::env::temp_dir().join("sovran-datastore-demo");
    facade::init(DataConfig::from_env("app-state-demo").with_data_dir(&dir))?;
    println!("Data file: {}", facade::get_path().display());

    facade::on_error(|error| eprintln!("persistence failed: {error}"));

    // Pick up whatever an earlier run left behind
    let state = facade::load(None, None).await.unwrap_or(DataState::Error);
    if state == DataState::Error {
        println!("No previous state, starting fresh");
    }

    // Settings with defaults on first run
    let (_, volume) = facade::try_get_value_or_store("volume", 0.8f32);
    let (_, fullscreen) = facade::try_get_value_or_store("fullscreen", false);
    facade::try_get_value_or_store("ui_tint", Color::new(1.0, 1.0, 1.0, 1.0));
    println!("volume = {volume}, fullscreen = {fullscreen}");

    // Progress
    let (_, runs) = facade::try_get_value("runs", 0);
    facade::set_value("runs", runs + 1);
    facade::set_value("last_cursor", Vector2::new(320.0, 240.0));
    facade::set_value("player_name", "alice");

    print_state();

    let callback: DataCallback = Box::new(|state: DataState, error: Option<&DataError>| match error {
        Some(error) => println!("save finished with {state:?}: {error}"),
        None => println!("save finished with {state:?}"),
    });
    facade::save(None, Some(callback))
        .await
        .unwrap_or(DataState::Error);

    Ok(())
}

fn print_state() {
    println!("\nAll keys:");
    for (key, kind) in facade::all_keys() {
        println!("  {key:<12} {kind}");
    }

    println!("\nVector entries:");
    for (key, _) in facade::search_key("Vec", SearchCase::Sensitive) {
        println!("  {key}");
    }

    println!(
        "\nruns is an {}",
        facade::get_value_type("runs").unwrap_or(ValueKind::Data)
    );
}
