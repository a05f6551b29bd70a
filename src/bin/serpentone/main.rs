//! serpentone - terminal snake with procedural audio
//!
//! Run with: cargo run

mod app;
mod ui;

use app::App;
use serpentone::director::AudioDirector;
use serpentone::error::AudioError;
use serpentone::graph::{AudioBackend, CpalBackend};
use serpentone::melody::MelodyCatalog;
use serpentone::prefs::{FilePrefs, MemoryStore, PrefStore};

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let prefs: Box<dyn PrefStore> = match FilePrefs::open_default() {
        Some(prefs) => Box::new(prefs),
        None => Box::new(MemoryStore::new()),
    };
    let factory = Box::new(|| -> Result<Box<dyn AudioBackend>, AudioError> {
        CpalBackend::open().map(|backend| Box::new(backend) as Box<dyn AudioBackend>)
    });
    let director = AudioDirector::new(factory, prefs, MelodyCatalog::standard());

    let mut terminal = ratatui::init();
    let result = App::new(director).run(&mut terminal);
    ratatui::restore();
    result
}
