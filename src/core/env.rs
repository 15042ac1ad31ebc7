//! The shared build configuration that options write their flags into.

use std::collections::BTreeMap;

use crate::core::settings::Value;
use crate::util::platform::Platform;

/// Well-known construction variables.
pub mod keys {
    /// Include search paths
    pub const CPPPATH: &str = "CPPPATH";
    /// Library search paths
    pub const LIBPATH: &str = "LIBPATH";
    /// Libraries to link
    pub const LIBS: &str = "LIBS";
    /// Extra linker flags (including frameworks)
    pub const LINKFLAGS: &str = "LINKFLAGS";
    /// Preprocessor defines
    pub const CPPDEFINES: &str = "CPPDEFINES";
    /// C++ compiler flags
    pub const CXXFLAGS: &str = "CXXFLAGS";
    /// C and C++ compiler flags
    pub const CCFLAGS: &str = "CCFLAGS";
    /// Static library archiver flags
    pub const ARFLAGS: &str = "ARFLAGS";
}

/// Named build variables, each a scalar or a list.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildEnv {
    vars: BTreeMap<String, Value>,
    platform: Platform,
}

impl BuildEnv {
    pub fn new(platform: Platform) -> Self {
        BuildEnv {
            vars: BTreeMap::new(),
            platform,
        }
    }

    /// An environment for the host platform.
    pub fn host() -> Self {
        Self::new(Platform::host())
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Prefix placed before include paths that go into compiler flags.
    pub fn include_prefix(&self) -> &'static str {
        self.platform.include_prefix()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// The variable flattened to strings; empty when unset.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.vars.get(key).map(Value::to_strings).unwrap_or_default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.vars.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.vars.remove(key)
    }

    /// Append items to a list variable. A scalar is promoted to a list.
    pub fn append<I, S>(&mut self, key: &str, items: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = self.take_list(key);
        list.extend(items.into_iter().map(|s| Value::Str(s.into())));
        self.vars.insert(key.to_string(), Value::List(list));
    }

    /// Append items that are not already present.
    pub fn append_unique<I, S>(&mut self, key: &str, items: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = self.take_list(key);
        for item in items {
            let item = Value::Str(item.into());
            if !list.contains(&item) {
                list.push(item);
            }
        }
        self.vars.insert(key.to_string(), Value::List(list));
    }

    fn take_list(&mut self, key: &str) -> Vec<Value> {
        match self.vars.remove(key) {
            Some(Value::List(items)) => items,
            Some(scalar) if !scalar.is_empty() => vec![scalar],
            _ => Vec::new(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.vars.iter()
    }
}

impl Default for BuildEnv {
    fn default() -> Self {
        Self::host()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_unique_keeps_order() {
        let mut env = BuildEnv::new(Platform::Linux);
        env.append_unique(keys::LIBS, ["SDL", "pthread"]);
        env.append_unique(keys::LIBS, ["pthread", "m"]);
        assert_eq!(env.get_list(keys::LIBS), vec!["SDL", "pthread", "m"]);
    }

    #[test]
    fn test_append_promotes_scalar() {
        let mut env = BuildEnv::new(Platform::Linux);
        env.set(keys::LINKFLAGS, "-pthread");
        env.append(keys::LINKFLAGS, ["-rdynamic"]);
        assert_eq!(env.get_list(keys::LINKFLAGS), vec!["-pthread", "-rdynamic"]);

        env.set(keys::CXXFLAGS, "");
        env.append(keys::CXXFLAGS, ["-O2"]);
        assert_eq!(env.get_list(keys::CXXFLAGS), vec!["-O2"]);
    }

    #[test]
    fn test_clone_is_independent() {
        let mut env = BuildEnv::new(Platform::Linux);
        env.append(keys::CPPPATH, ["/usr/include/SDL"]);
        let mut copy = env.clone();
        copy.append(keys::CPPPATH, ["/opt/include"]);
        assert_eq!(env.get_list(keys::CPPPATH).len(), 1);
        assert_eq!(copy.get_list(keys::CPPPATH).len(), 2);
    }
}
