use std::fmt::Debug;

#[cfg(test)]
use mockall::automock;

/// Key/value store for persisted per-item configuration.
///
/// Keys are [`Identifier::setting_key`](crate::core::Identifier::setting_key) strings
/// such as `"/ram/load/0:hidden"`. The engine depends on this contract only, never on
/// a storage format.
#[cfg_attr(test, automock)]
pub trait Settings: Debug + Send + Sync {
    /// Stored value for `key`, or `default` when absent
    fn get(&self, key: &str, default: &str) -> String;

    fn set(&self, key: &str, value: &str);

    fn remove(&self, key: &str);

    fn contains(&self, key: &str) -> bool;
}

/// Typed helpers over any [`Settings`] store
pub trait SettingsExt {
    fn get_bool(&self, key: &str, default: bool) -> bool;
    fn set_bool(&self, key: &str, value: bool);
}

impl<T: Settings + ?Sized> SettingsExt for T {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        if !self.contains(key) {
            return default;
        }
        match self.get(key, "").trim().to_ascii_lowercase().as_str() {
            "true" | "1" => true,
            "false" | "0" => false,
            _ => default,
        }
    }

    fn set_bool(&self, key: &str, value: bool) {
        self.set(key, if value { "true" } else { "false" });
    }
}
