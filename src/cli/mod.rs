//! CLI module for the detection service
//!
//! - `serve`: HTTP API with the background queue
//! - `detect`: annotate a local image file

pub mod detect;
pub mod serve;

use clap::{Parser, Subcommand};

/// Detecção de Criadouro - breeding site detection service
#[derive(Parser)]
#[command(name = "criadouro-detection")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API and queue processor
    Serve(serve::ServeArgs),

    /// Run detection on a local image
    Detect(detect::DetectArgs),
}
