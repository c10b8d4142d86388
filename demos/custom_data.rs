use serde::{Deserialize, Serialize};
use sovran_datastore::{
    export_preferences, BoolExport, DataContainer, DataError, DataState, MemoryPreferences,
    StorableData, TransformData, Vector3,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Inventory {
    gold: u32,
    items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Item {
    name: String,
    weight: f32,
}

impl StorableData for Inventory {
    const TYPE_NAME: &'static str = "Inventory";
}

/// Demonstrates storing user-defined records next to plain values
#[tokio::main]
async fn main() -> Result<(), DataError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    let container = DataContainer::acquire();
    container.register_data::<Inventory>()?;

    container.set_data(
        "inventory",
        Inventory {
            gold: 120,
            items: vec![
                Item {
                    name: "rope".into(),
                    weight: 1.5,
                },
                Item {
                    name: "lantern".into(),
                    weight: 0.75,
                },
            ],
        },
    )?;
    container.set_data(
        "player",
        TransformData {
            position: Vector3::new(4.0, 0.0, -2.0),
            ..Default::default()
        },
    )?;
    container.set_value("gold_multiplier", 1.25f32);
    container.set_value("hardcore", true);

    println!("Encoded store:\n{}", container.save_to_string()?);

    let file = std::env::temp_dir().join("sovran-datastore-custom.json");
    let state = container
        .save(Some(file.as_path()), None)
        .await
        .unwrap_or(DataState::Error);
    println!("\nsaved to {} ({state:?})", file.display());

    // Start over and read it back
    container.delete_all();
    container.load(Some(file.as_path()), None).await.unwrap_or(DataState::Error);

    let total_weight = container
        .with(|store| {
            store.with_data("inventory", |inv: &Inventory| {
                inv.items.iter().map(|item| item.weight).sum::<f32>()
            })
        })
        .unwrap_or_default();
    println!("inventory weighs {total_weight}");

    let player = container.get_data("player", TransformData::default());
    println!("player at {:?}", player.position);

    // Scalars can also go to a flat preference backend
    let mut prefs = MemoryPreferences::new();
    let written = container.with(|store| export_preferences(store, &mut prefs, BoolExport::Standard));
    println!("\nexported {written} preferences:");
    for (key, value) in &prefs.entries {
        println!("  {key} = {value:?}");
    }

    container.release();
    Ok(())
}
