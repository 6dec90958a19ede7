use std::{error::Error, path::PathBuf, sync::Arc};

use character_animator::Character;
use character_asset::{
    buffer::HostMemory,
    loader::{
        gltf::{load_from_path, UNTITLED},
        AssetLoadParams,
    },
    GltfAsset,
};
use clap::Parser;
use env_logger::Env;
use glam::Mat4;
use log::info;

/// Load a skinned glTF character, print what it contains and play one of its
/// animations for a few frames.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// `.gltf` or `.glb` file
    input: PathBuf,

    /// Animation to play, the first one when omitted
    #[arg(short, long)]
    animation: Option<String>,

    /// Number of frames to evaluate
    #[arg(short, long, default_value_t = 4)]
    frames: u32,

    /// Frames per second of the simulated playback
    #[arg(long, default_value_t = 30.0)]
    fps: f32,

    /// Override the playback speed of the animation
    #[arg(long)]
    speed: Option<f32>,

    /// Log load stages
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let mut asset = load_from_path(&cli.input, &mut HostMemory, &AssetLoadParams::default())?;
    if let Some(speed) = cli.speed {
        for clip in &mut asset.animations {
            clip.speed = speed;
        }
    }
    print_asset(&asset);

    let asset = Arc::new(asset);
    if asset.animations.is_empty() {
        info!("Nothing to play");
        return Ok(());
    }

    let mut character = Character::new(asset);
    match &cli.animation {
        Some(name) => character.run_animation_by_name(name)?,
        None => character.run_default_animation()?,
    }

    let delta = 1.0 / cli.fps.max(f32::EPSILON);
    for frame in 0..cli.frames {
        if frame > 0 {
            character.update(delta);
        }
        println!("frame {} t={:.3}s", frame, character.current_time());
        for palette in character.palettes() {
            println!("  {} ({})", palette.node, palette.skin);
            for (slot, matrix) in palette.matrices.iter().enumerate() {
                println!("    [{}] {}", slot, format_matrix(matrix));
            }
        }
    }
    Ok(())
}

fn print_asset<B>(asset: &GltfAsset<B>) {
    println!(
        "{} buffers, {} accessors, {} meshes, {} nodes",
        asset.buffers.len(),
        asset.accessors.len(),
        asset.meshes.len(),
        asset.nodes.len()
    );
    for (index, scene) in asset.scenes.iter().enumerate() {
        let default = if asset.scene.map(|scene| scene.0) == Some(index) {
            " (default)"
        } else {
            ""
        };
        println!(
            "scene {} \"{}\"{}: {} roots, {} mesh nodes",
            index,
            scene.name,
            default,
            scene.nodes.len(),
            scene.mesh_nodes.len()
        );
    }
    for skin in &asset.skins {
        let joints: Vec<&str> = skin
            .joints
            .iter()
            .filter_map(|joint| asset.node(*joint))
            .map(|node| node.name.as_str())
            .collect();
        println!(
            "skin {} \"{}\": {} joints [{}]",
            skin.index.0,
            skin.name.as_deref().unwrap_or(UNTITLED),
            skin.joint_count(),
            joints.join(", ")
        );
    }
    for clip in &asset.animations {
        println!(
            "animation {} \"{}\": {:.3}s, {} tracks",
            clip.index.0,
            clip.name,
            clip.duration,
            clip.node_animations.len()
        );
    }
    for skipped in &asset.skipped_channels {
        println!(
            "skipped {} channel {}: {}",
            skipped.animation, skipped.channel, skipped.reason
        );
    }
}

fn format_matrix(matrix: &Mat4) -> String {
    let columns = matrix.to_cols_array();
    let values: Vec<String> = columns.iter().map(|value| format!("{:.3}", value)).collect();
    values.join(" ")
}
