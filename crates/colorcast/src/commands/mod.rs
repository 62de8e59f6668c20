pub mod check;
pub mod classify;
pub mod show;

use crate::cli::ScopeArgs;
use anyhow::Result;
use classifier::{ClassificationEngine, ColorCastService, TypeResolver};
use event_bus::EventBus;
use rule_config::config_directory::ConfigDirectory;
use rule_config::{ConfigStore, JsonConfigStore, SchemeKind};
use std::sync::Arc;

/// Opens the default and (optional) project scopes and loads the active scheme.
///
/// Nothing is written: missing scope files read as empty schemes.
pub fn open_service<R: TypeResolver>(
    scopes: &ScopeArgs,
    resolver: R,
) -> Result<ColorCastService<R>> {
    let default_path = match &scopes.config {
        Some(path) => path.clone(),
        None => ConfigDirectory::locate_system_default()?.config_path,
    };
    let default_store: Arc<dyn ConfigStore> =
        Arc::new(JsonConfigStore::open(default_path, SchemeKind::Default)?);

    let project_store = match &scopes.project {
        Some(project_root) => {
            let directory = ConfigDirectory::locate_project(project_root);
            let store = JsonConfigStore::open(directory.config_path, SchemeKind::Project)?;
            Some(Arc::new(store) as Arc<dyn ConfigStore>)
        }
        None => None,
    };

    let service = ColorCastService::new(
        ClassificationEngine::new(resolver),
        default_store,
        project_store,
        EventBus::new(),
    );
    service.load()?;
    Ok(service)
}
