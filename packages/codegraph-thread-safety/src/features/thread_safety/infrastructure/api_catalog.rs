//! Library API models
//!
//! Static table of recognized library signatures (class pattern, method
//! pattern) → behavior. Matching walks the callee class and its ancestors,
//! so `ReentrantLock.lock` is found through `Lock.lock` when the hierarchy
//! is known. Configuration can append entries.
//!
//! Patterns: `*Suffix` matches a class by suffix, `prefix.*` by prefix, `*`
//! matches any method name.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::features::thread_safety::ports::AnnotationOracle;
use crate::shared::models::ProcName;

/// Behavior of a modeled library method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiModelKind {
    Lock,
    Unlock,
    /// `tryLock()`: result is true iff the lock was acquired
    LockedIfTrue,
    AssertHoldsLock,
    AssertMainThread,
    /// `isMainThread()`: result is true iff on the main thread
    MainThreadIfTrue,
    /// Result is a fresh, unshared object
    OwnedResult,
    /// Result has no observable side effect
    Functional,
    /// Mutates the contents of the receiver
    ContainerWrite,
}

/// One catalog row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiModelEntry {
    pub class_name: String,
    pub method_name: String,
    pub model: ApiModelKind,
    /// Methods excluded from a `*` method pattern
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub except: Vec<String>,
}

impl ApiModelEntry {
    pub fn new(class_name: &str, method_name: &str, model: ApiModelKind) -> Self {
        Self {
            class_name: class_name.to_string(),
            method_name: method_name.to_string(),
            model,
            except: Vec::new(),
        }
    }

    fn matches_method(&self, method_name: &str) -> bool {
        if self.method_name == "*" {
            !self.except.iter().any(|m| m == method_name)
        } else {
            self.method_name == method_name
        }
    }

    fn matches_class(&self, class_name: &str) -> bool {
        class_pattern_matches(&self.class_name, class_name)
    }
}

fn class_pattern_matches(pattern: &str, class_name: &str) -> bool {
    if let Some(suffix) = pattern.strip_prefix('*') {
        class_name.ends_with(suffix)
    } else if let Some(prefix) = pattern.strip_suffix('*') {
        class_name.starts_with(prefix)
    } else {
        pattern == class_name
    }
}

/// Lock effect of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockEffect {
    Lock,
    Unlock,
    LockedIfTrue,
}

/// Thread effect of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadEffect {
    AssertMainThread,
    MainThreadIfTrue,
}

/// Everything the catalog knows about one callee
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CalleeModel {
    pub lock: Option<LockEffect>,
    pub thread: Option<ThreadEffect>,
    pub owned_result: bool,
    pub functional: bool,
    pub container_write: bool,
}

impl CalleeModel {
    fn apply(&mut self, kind: ApiModelKind) {
        match kind {
            ApiModelKind::Lock | ApiModelKind::AssertHoldsLock => {
                self.lock.get_or_insert(LockEffect::Lock);
            }
            ApiModelKind::Unlock => {
                self.lock.get_or_insert(LockEffect::Unlock);
            }
            ApiModelKind::LockedIfTrue => {
                self.lock.get_or_insert(LockEffect::LockedIfTrue);
            }
            ApiModelKind::AssertMainThread => {
                self.thread.get_or_insert(ThreadEffect::AssertMainThread);
            }
            ApiModelKind::MainThreadIfTrue => {
                self.thread.get_or_insert(ThreadEffect::MainThreadIfTrue);
            }
            ApiModelKind::OwnedResult => self.owned_result = true,
            ApiModelKind::Functional => self.functional = true,
            ApiModelKind::ContainerWrite => self.container_write = true,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Built-in tables
// ═══════════════════════════════════════════════════════════════════════════

const LOCK_CLASSES: &[&str] = &[
    "java.util.concurrent.locks.Lock",
    "java.util.concurrent.locks.ReentrantLock",
    "java.util.concurrent.locks.ReentrantReadWriteLock$ReadLock",
    "java.util.concurrent.locks.ReentrantReadWriteLock$WriteLock",
];

const THREAD_UTIL_CLASSES: &[&str] = &["*ThreadUtils", "*ThreadUtil"];

const BOXED_CLASSES: &[&str] = &[
    "java.lang.Boolean",
    "java.lang.Byte",
    "java.lang.Character",
    "java.lang.Double",
    "java.lang.Float",
    "java.lang.Integer",
    "java.lang.Long",
    "java.lang.Short",
];

/// `Resources` getters that hand out stateful objects
const STATEFUL_RESOURCES_METHODS: &[&str] = &[
    "getAssets",
    "getConfiguration",
    "getSystem",
    "newTheme",
    "openRawResource",
    "openRawResourceFd",
];

const CONTAINER_WRITES: &[(&str, &[&str])] = &[
    ("java.util.List", &["add", "addAll", "clear", "remove", "set"]),
    ("java.util.Map", &["clear", "put", "putAll", "remove"]),
    (
        "android.util.SparseArray",
        &[
            "append",
            "clear",
            "delete",
            "put",
            "remove",
            "removeAt",
            "removeAtRange",
            "setValueAt",
        ],
    ),
    (
        "android.support.v4.util.SimpleArrayMap",
        &[
            "clear",
            "ensureCapacity",
            "put",
            "putAll",
            "remove",
            "removeAt",
            "setValueAt",
        ],
    ),
    (
        "android.support.v4.util.Pools$SimplePool",
        &["acquire", "release"],
    ),
];

const THREAD_SAFE_CONTAINERS: &[&str] = &[
    "java.util.concurrent.ConcurrentMap",
    "java.util.concurrent.CopyOnWriteArrayList",
    "android.support.v4.util.Pools$SynchronizedPool",
];

const IMMUTABLE_COLLECTIONS: &[&str] = &[
    "com.google.common.collect.ImmutableCollection",
    "com.google.common.collect.ImmutableMap",
    "com.google.common.collect.ImmutableTable",
];

const LOGGING_CLASSES: &[&str] = &["android.util.Log"];

static BUILTIN_MODELS: Lazy<Vec<ApiModelEntry>> = Lazy::new(|| {
    let mut entries = Vec::with_capacity(64);

    // Locks
    for class in LOCK_CLASSES {
        entries.push(ApiModelEntry::new(class, "lock", ApiModelKind::Lock));
        entries.push(ApiModelEntry::new(class, "lockInterruptibly", ApiModelKind::Lock));
        entries.push(ApiModelEntry::new(class, "unlock", ApiModelKind::Unlock));
        entries.push(ApiModelEntry::new(class, "tryLock", ApiModelKind::LockedIfTrue));
    }

    // Thread assertions
    for class in THREAD_UTIL_CLASSES {
        for method in ["assertMainThread", "assertOnUiThread", "checkOnMainThread"] {
            entries.push(ApiModelEntry::new(class, method, ApiModelKind::AssertMainThread));
        }
        for method in ["isMainThread", "isUiThread"] {
            entries.push(ApiModelEntry::new(class, method, ApiModelKind::MainThreadIfTrue));
        }
        entries.push(ApiModelEntry::new(
            class,
            "assertHoldsLock",
            ApiModelKind::AssertHoldsLock,
        ));
    }

    // Fresh objects
    for (class, method) in [
        ("javax.inject.Provider", "get"),
        ("java.lang.Class", "newInstance"),
        ("java.lang.reflect.Constructor", "newInstance"),
        ("java.lang.ThreadLocal", "get"),
        ("android.support.v4.util.Pools$SimplePool", "acquire"),
        ("android.support.v4.util.Pools$SynchronizedPool", "acquire"),
    ] {
        entries.push(ApiModelEntry::new(class, method, ApiModelKind::OwnedResult));
    }

    // Functional
    for class in BOXED_CLASSES {
        entries.push(ApiModelEntry::new(class, "valueOf", ApiModelKind::Functional));
    }
    entries.push(ApiModelEntry {
        class_name: "android.content.res.Resources".to_string(),
        method_name: "*".to_string(),
        model: ApiModelKind::Functional,
        except: STATEFUL_RESOURCES_METHODS
            .iter()
            .map(|m| m.to_string())
            .collect(),
    });

    // Container mutators
    for (class, methods) in CONTAINER_WRITES {
        for method in *methods {
            entries.push(ApiModelEntry::new(class, method, ApiModelKind::ContainerWrite));
        }
    }

    entries
});

// ═══════════════════════════════════════════════════════════════════════════
// Catalog
// ═══════════════════════════════════════════════════════════════════════════

/// Built-in models plus configured extensions
#[derive(Debug, Clone)]
pub struct ApiCatalog {
    extra_models: Vec<ApiModelEntry>,
    thread_safe_containers: BTreeSet<String>,
    builder_class_suffix: String,
}

impl Default for ApiCatalog {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new(), "Builder")
    }
}

impl ApiCatalog {
    pub fn new(
        extra_models: Vec<ApiModelEntry>,
        extra_thread_safe_containers: Vec<String>,
        builder_class_suffix: impl Into<String>,
    ) -> Self {
        let mut thread_safe_containers: BTreeSet<String> =
            THREAD_SAFE_CONTAINERS.iter().map(|c| c.to_string()).collect();
        thread_safe_containers.extend(extra_thread_safe_containers);
        Self {
            extra_models,
            thread_safe_containers,
            builder_class_suffix: builder_class_suffix.into(),
        }
    }

    fn entries(&self) -> impl Iterator<Item = &ApiModelEntry> {
        BUILTIN_MODELS.iter().chain(self.extra_models.iter())
    }

    /// Models matching `callee` through its class or any ancestor
    pub fn model_of(&self, callee: &ProcName, oracle: &dyn AnnotationOracle) -> CalleeModel {
        let mut model = CalleeModel::default();
        for class in oracle.ancestors(&callee.class_name) {
            for entry in self.entries() {
                if entry.matches_class(&class) && entry.matches_method(&callee.method_name) {
                    model.apply(entry.model);
                }
            }
        }
        model
    }

    pub fn is_thread_safe_container(&self, class_name: &str, oracle: &dyn AnnotationOracle) -> bool {
        oracle.supertype_exists(class_name, &|class| self.thread_safe_containers.contains(class))
    }

    pub fn is_immutable_collection(&self, class_name: &str, oracle: &dyn AnnotationOracle) -> bool {
        oracle.supertype_exists(class_name, &|class| IMMUTABLE_COLLECTIONS.contains(&class))
    }

    pub fn is_logging_class(&self, class_name: &str, oracle: &dyn AnnotationOracle) -> bool {
        oracle.supertype_exists(class_name, &|class| LOGGING_CLASSES.contains(&class))
    }

    pub fn is_builder_class(&self, class_name: &str) -> bool {
        !self.builder_class_suffix.is_empty() && class_name.ends_with(&self.builder_class_suffix)
    }
}
