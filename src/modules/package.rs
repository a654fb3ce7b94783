//=============================================
// nekoscript/modules/package.rs
//=============================================
// Author: ZobieLabs
// License: Duality Public License (DPL v1.0)
// Goal: Published package store
// Objective: Keep immutable published packages, snapshot them to JSON and
//            fetch missing ones from a remote registry
//=============================================

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

pub type SharedPackageStore = Arc<RwLock<PackageStore>>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PackageError {
    #[error("le paquet '{0}' existe déjà")]
    AlreadyExists(String),
    #[error("paquet '{0}' introuvable")]
    NotFound(String),
    #[error("aucun module hôte enregistré sous le nom '{0}'")]
    UnknownHostFactory(String),
    #[error("erreur d'entrée/sortie du magasin de paquets : {0}")]
    Io(String),
    #[error("format de paquet invalide : {0}")]
    Serialization(String),
    #[error("registre distant indisponible : {0}")]
    Remote(String),
}

impl From<std::io::Error> for PackageError {
    fn from(value: std::io::Error) -> Self {
        PackageError::Io(value.to_string())
    }
}

impl From<serde_json::Error> for PackageError {
    fn from(value: serde_json::Error) -> Self {
        PackageError::Serialization(value.to_string())
    }
}

/// A published package. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    #[serde(alias = "sourceCode", alias = "code")]
    pub source_code: String,
    #[serde(default, alias = "isHostCode", alias = "isJavaScript")]
    pub is_host_code: bool,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "Utc::now", alias = "publishedAt")]
    pub published_at: DateTime<Utc>,
}

fn default_version() -> String {
    "1.0.0".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageSummary {
    pub name: String,
    pub version: String,
    pub is_host_code: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PackageStore {
    packages: BTreeMap<String, Package>,
}

impl PackageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(self) -> SharedPackageStore {
        Arc::new(RwLock::new(self))
    }

    /// Publish a new package. An existing name is never overwritten.
    pub fn publish(
        &mut self,
        name: &str,
        source_code: &str,
        is_host_code: bool,
    ) -> Result<&Package, PackageError> {
        let package = Package {
            name: name.to_string(),
            source_code: source_code.to_string(),
            is_host_code,
            version: default_version(),
            published_at: Utc::now(),
        };
        self.insert(package)
    }

    pub fn insert(&mut self, package: Package) -> Result<&Package, PackageError> {
        if self.packages.contains_key(&package.name) {
            return Err(PackageError::AlreadyExists(package.name));
        }
        tracing::info!(package = %package.name, host = package.is_host_code, "package published");
        let name = package.name.clone();
        Ok(self.packages.entry(name).or_insert(package))
    }

    pub fn get(&self, name: &str) -> Option<&Package> {
        self.packages.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.packages.contains_key(name)
    }

    pub fn list(&self) -> Vec<PackageSummary> {
        self.packages
            .values()
            .map(|package| PackageSummary {
                name: package.name.clone(),
                version: package.version.clone(),
                is_host_code: package.is_host_code,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    //=============================================
    //            Section 1: Persistence
    //=============================================

    /// Load a JSON snapshot, or an empty store when the file is absent.
    pub fn load_json(path: &Path) -> Result<Self, PackageError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        let packages: Vec<Package> = serde_json::from_str(&data)?;
        let mut store = Self::default();
        for package in packages {
            store.packages.insert(package.name.clone(), package);
        }
        Ok(store)
    }

    pub fn save_json(&self, path: &Path) -> Result<(), PackageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let packages: Vec<&Package> = self.packages.values().collect();
        fs::write(path, serde_json::to_string_pretty(&packages)?)?;
        Ok(())
    }
}

/// Fetch `GET {registry}/packages/{name}` from a remote package registry.
pub fn fetch_remote(registry_url: &str, name: &str) -> Result<Package, PackageError> {
    let url = format!("{}/packages/{}", registry_url.trim_end_matches('/'), name);
    tracing::debug!(%url, "fetching package from remote registry");
    let response = ureq::get(&url).call().map_err(|error| match error {
        ureq::Error::Status(404, _) => PackageError::NotFound(name.to_string()),
        other => PackageError::Remote(other.to_string()),
    })?;
    response
        .into_json::<Package>()
        .map_err(|error| PackageError::Serialization(error.to_string()))
}
