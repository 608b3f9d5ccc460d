//! Device settings persisted as a small JSON document on the flash volume.
//!
//! Settings are not needed to boot, so nothing in here fails: a missing or unreadable file yields
//! empty settings and a failed save is only logged.

use crate::fs::Filesystem;
use crate::legacy;
use crate::platform::Platform;
use alloc::string::String;
use alloc::vec::Vec;
#[cfg(feature = "defmt")]
use defmt::{trace, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

pub const CONFIG_FILE: &str = "/settings.json";

/// Network credentials and provisioning identifiers. Empty strings mean "not set".
#[derive(Clone, Default, PartialEq, Eq, Debug)]
pub struct Settings {
    pub wifi_ssid: String,
    pub wifi_password: String,
    pub id_scope: String,
    pub registration_id: String,
    pub symmetric_key: String,
}

impl Settings {
    pub fn clear(&mut self) {
        *self = Settings::default();
    }

    pub fn is_empty(&self) -> bool {
        *self == Settings::default()
    }
}

#[derive(Serialize, Deserialize, Default)]
struct Document {
    #[serde(default, deserialize_with = "lenient_group")]
    wifi: Wifi,
    #[serde(default, deserialize_with = "lenient_group")]
    azure: Azure,
}

#[derive(Serialize, Deserialize, Default)]
struct Wifi {
    #[serde(default, deserialize_with = "lenient")]
    ssid: String,
    #[serde(default, deserialize_with = "lenient")]
    password: String,
}

#[derive(Serialize, Deserialize, Default)]
struct Azure {
    #[serde(default, deserialize_with = "lenient")]
    idscope: String,
    #[serde(default, deserialize_with = "lenient")]
    regid: String,
    #[serde(default, deserialize_with = "lenient")]
    symkey: String,
}

// a key holding something other than a string reads as unset
fn lenient<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        _ => Ok(String::new()),
    }
}

// a group that is not an object reads as a group without keys
fn lenient_group<'de, D, G>(deserializer: D) -> Result<G, D::Error>
where
    D: Deserializer<'de>,
    G: DeserializeOwned + Default,
{
    match serde_json::Value::deserialize(deserializer)? {
        value @ serde_json::Value::Object(_) => {
            Ok(serde_json::from_value(value).unwrap_or_default())
        }
        _ => Ok(G::default()),
    }
}

impl From<Document> for Settings {
    fn from(doc: Document) -> Self {
        Self {
            wifi_ssid: doc.wifi.ssid,
            wifi_password: doc.wifi.password,
            id_scope: doc.azure.idscope,
            registration_id: doc.azure.regid,
            symmetric_key: doc.azure.symkey,
        }
    }
}

impl From<&Settings> for Document {
    fn from(settings: &Settings) -> Self {
        Self {
            wifi: Wifi {
                ssid: settings.wifi_ssid.clone(),
                password: settings.wifi_password.clone(),
            },
            azure: Azure {
                idscope: settings.id_scope.clone(),
                regid: settings.registration_id.clone(),
                symkey: settings.symmetric_key.clone(),
            },
        }
    }
}

/// Parses a settings document. Anything that is not a JSON object gives empty settings; a group or
/// key of the wrong type only clears the fields it holds.
pub fn decode(contents: &[u8]) -> Settings {
    match serde_json::from_slice::<Document>(contents) {
        Ok(doc) => doc.into(),
        Err(_e) => {
            #[cfg(feature = "defmt")]
            warn!("settings: failed to parse, using defaults");
            #[cfg(feature = "debug-logs")]
            println!("settings: failed to parse: {_e}");
            Settings::default()
        }
    }
}

/// Serializes the complete document, pretty printed.
pub fn encode(settings: &Settings) -> Vec<u8> {
    // serializing plain strings into a Vec cannot fail
    serde_json::to_vec_pretty(&Document::from(settings)).unwrap_or_default()
}

/// Owns the settings record and the volume it is persisted on. Must only be used while the block
/// device is idle; both share the same chip.
pub struct SettingsStore<F: Filesystem> {
    fs: F,
    settings: Settings,
}

impl<F: Filesystem> SettingsStore<F> {
    /// Creates a store with empty settings. Call [`SettingsStore::load`] to read the file.
    pub fn new(fs: F) -> Self {
        Self {
            fs,
            settings: Settings::default(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    pub fn into_inner(self) -> F {
        self.fs
    }

    /// Remounts the volume and reads the settings file. Falls back to empty settings if the file
    /// is missing or cannot be parsed.
    pub fn load(&mut self) {
        #[cfg(feature = "defmt")]
        trace!("settings: load");

        if self.fs.remount().is_err() {
            #[cfg(feature = "defmt")]
            warn!("settings: remount failed");
        }

        self.settings = match self.fs.read_file(CONFIG_FILE) {
            Ok(contents) => decode(&contents),
            Err(_) => {
                #[cfg(feature = "defmt")]
                warn!("settings: no settings file, using defaults");
                Settings::default()
            }
        };
    }

    /// Replaces the settings file with the current record. Errors are ignored.
    pub fn save(&mut self) {
        #[cfg(feature = "defmt")]
        trace!("settings: save");

        let contents = encode(&self.settings);
        if self.fs.write_file(CONFIG_FILE, &contents).is_err() {
            #[cfg(feature = "defmt")]
            warn!("settings: failed to write settings file");
        }
    }

    /// Clears all fields and saves.
    pub fn erase(&mut self) {
        self.settings.clear();
        self.save();
    }

    /// Replaces the record with the settings found in the legacy region of the chip. The file is
    /// left alone; call [`SettingsStore::save`] to migrate.
    pub fn load_legacy<T: Platform>(&mut self, flash: &mut T) {
        self.settings = legacy::load(flash, legacy::LEGACY_OFFSET);
    }
}
