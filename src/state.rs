// src/state.rs

use crate::system::fetchers::HostUser;
use serde::Serialize;
use std::cell::{OnceCell, RefCell};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    #[error("Bootstrap value '{0}' was already set.")]
    AlreadySet(&'static str),
    #[error("Constant '{0}' is already defined.")]
    AlreadyDefined(String),
}

/// The parsed endpoint the host should believe the request came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestTarget {
    pub url: String,
    pub scheme: String,
    pub host: String,
    pub port: Option<u16>,
    pub path: String,
    pub query: Option<String>,
}

/// Network identity synthesized for multisite installs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteRecord {
    pub id: u64,
    pub blog_id: u64,
    pub domain: String,
    pub path: String,
    pub cookie_domain: String,
    pub site_name: String,
}

/// Blog identity synthesized for multisite installs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlogRecord {
    pub blog_id: u64,
    pub site_id: u64,
    pub domain: String,
    pub path: String,
    pub public: String,
    pub archived: String,
    pub mature: String,
    pub spam: String,
    pub deleted: String,
    pub lang_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilesystemMethod {
    Direct,
}

/// Process-wide bootstrap state.
///
/// Every value is written at most once over the life of a run; a second write is
/// reported as [`ContextError::AlreadySet`] and leaves the first value in place.
/// The context is handed around by reference and never stored globally.
#[derive(Debug, Default)]
pub struct BootstrapContext {
    host_root: OnceCell<PathBuf>,
    document_root: OnceCell<PathBuf>,
    request: OnceCell<RequestTarget>,
    installing: OnceCell<bool>,
    importing: OnceCell<bool>,
    load_importers: OnceCell<bool>,
    current_site: OnceCell<SiteRecord>,
    current_blog: OnceCell<BlogRecord>,
    cookie_hash: OnceCell<String>,
    admin_screen: OnceCell<String>,
    filesystem_method: OnceCell<FilesystemMethod>,
    current_user: OnceCell<HostUser>,
    constants: RefCell<BTreeMap<String, String>>,
    loaded_files: RefCell<Vec<PathBuf>>,
}

fn set_once<T>(cell: &OnceCell<T>, name: &'static str, value: T) -> Result<(), ContextError> {
    cell.set(value).map_err(|_| ContextError::AlreadySet(name))?;
    log::debug!("Bootstrap value '{}' set.", name);
    Ok(())
}

impl BootstrapContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_host_root(&self, root: PathBuf) -> Result<(), ContextError> {
        set_once(&self.host_root, "host_root", root)
    }

    pub fn host_root(&self) -> Option<&Path> {
        self.host_root.get().map(PathBuf::as_path)
    }

    pub fn set_document_root(&self, root: PathBuf) -> Result<(), ContextError> {
        set_once(&self.document_root, "document_root", root)
    }

    pub fn document_root(&self) -> Option<&Path> {
        self.document_root.get().map(PathBuf::as_path)
    }

    pub fn set_request(&self, target: RequestTarget) -> Result<(), ContextError> {
        set_once(&self.request, "request", target)
    }

    pub fn request(&self) -> Option<&RequestTarget> {
        self.request.get()
    }

    pub fn mark_installing(&self) -> Result<(), ContextError> {
        set_once(&self.installing, "installing", true)
    }

    pub fn is_installing(&self) -> bool {
        self.installing.get().copied().unwrap_or(false)
    }

    pub fn mark_importing(&self) -> Result<(), ContextError> {
        set_once(&self.load_importers, "load_importers", true)?;
        set_once(&self.importing, "importing", true)
    }

    pub fn is_importing(&self) -> bool {
        self.importing.get().copied().unwrap_or(false)
    }

    pub fn loads_importers(&self) -> bool {
        self.load_importers.get().copied().unwrap_or(false)
    }

    pub fn set_network(&self, site: SiteRecord, blog: BlogRecord) -> Result<(), ContextError> {
        set_once(&self.current_site, "current_site", site)?;
        set_once(&self.current_blog, "current_blog", blog)
    }

    pub fn current_site(&self) -> Option<&SiteRecord> {
        self.current_site.get()
    }

    pub fn current_blog(&self) -> Option<&BlogRecord> {
        self.current_blog.get()
    }

    pub fn set_cookie_hash(&self, hash: String) -> Result<(), ContextError> {
        set_once(&self.cookie_hash, "cookie_hash", hash)
    }

    pub fn cookie_hash(&self) -> Option<&str> {
        self.cookie_hash.get().map(String::as_str)
    }

    pub fn set_admin_screen(&self, screen: &str) -> Result<(), ContextError> {
        set_once(&self.admin_screen, "admin_screen", screen.to_string())
    }

    pub fn admin_screen(&self) -> Option<&str> {
        self.admin_screen.get().map(String::as_str)
    }

    pub fn set_filesystem_method(&self, method: FilesystemMethod) -> Result<(), ContextError> {
        set_once(&self.filesystem_method, "filesystem_method", method)
    }

    pub fn filesystem_method(&self) -> Option<FilesystemMethod> {
        self.filesystem_method.get().copied()
    }

    pub fn set_current_user(&self, user: HostUser) -> Result<(), ContextError> {
        set_once(&self.current_user, "current_user", user)
    }

    pub fn current_user(&self) -> Option<&HostUser> {
        self.current_user.get()
    }

    /// Defines a host constant. Like the host's own `define`, a name can only be
    /// defined once.
    pub fn define(&self, name: &str, value: &str) -> Result<(), ContextError> {
        let mut constants = self.constants.borrow_mut();
        if constants.contains_key(name) {
            return Err(ContextError::AlreadyDefined(name.to_string()));
        }
        log::trace!("Constant '{}' defined.", name);
        constants.insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn constant(&self, name: &str) -> Option<String> {
        self.constants.borrow().get(name).cloned()
    }

    pub fn constants(&self) -> BTreeMap<String, String> {
        self.constants.borrow().clone()
    }

    /// Records a file handed to the host loader, in load order.
    pub fn record_loaded_file(&self, path: &Path) {
        self.loaded_files.borrow_mut().push(path.to_path_buf());
    }

    pub fn loaded_files(&self) -> Vec<PathBuf> {
        self.loaded_files.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_are_set_once() {
        let ctx = BootstrapContext::new();
        ctx.set_host_root(PathBuf::from("/srv/a")).unwrap();
        assert_eq!(
            ctx.set_host_root(PathBuf::from("/srv/b")),
            Err(ContextError::AlreadySet("host_root"))
        );
        assert_eq!(ctx.host_root(), Some(Path::new("/srv/a")));
    }

    #[test]
    fn test_flags_default_to_false() {
        let ctx = BootstrapContext::new();
        assert!(!ctx.is_installing());
        assert!(!ctx.is_importing());
        ctx.mark_importing().unwrap();
        assert!(ctx.is_importing());
        assert!(ctx.loads_importers());
        assert!(ctx.mark_importing().is_err());
    }

    #[test]
    fn test_constants_can_not_be_redefined() {
        let ctx = BootstrapContext::new();
        ctx.define("DB_NAME", "wp").unwrap();
        assert_eq!(
            ctx.define("DB_NAME", "other"),
            Err(ContextError::AlreadyDefined("DB_NAME".to_string()))
        );
        assert_eq!(ctx.constant("DB_NAME").as_deref(), Some("wp"));
        assert_eq!(ctx.constant("DB_USER"), None);
    }
}
