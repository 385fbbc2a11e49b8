//! Template loading and caching

use crate::error::{PerceptionError, PerceptionResult};
use image::{GrayImage, RgbImage};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// A reference image with its grayscale derivative
#[derive(Debug, Clone)]
pub struct Template {
    name: String,
    color: RgbImage,
    gray: GrayImage,
}

impl Template {
    pub fn from_image(name: impl Into<String>, color: RgbImage) -> PerceptionResult<Self> {
        let name = name.into();
        if color.width() == 0 || color.height() == 0 {
            return Err(PerceptionError::EmptyTemplate { name });
        }
        let gray = image::imageops::grayscale(&color);
        Ok(Self { name, color, gray })
    }

    /// Category-qualified name, e.g. `screens/main_menu`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Category part of the name (`screens`, `hud`, `npcs`, ...), if any
    pub fn category(&self) -> Option<&str> {
        self.name.split_once('/').map(|(category, _)| category)
    }

    pub fn color(&self) -> &RgbImage {
        &self.color
    }

    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }

    pub fn width(&self) -> u32 {
        self.color.width()
    }

    pub fn height(&self) -> u32 {
        self.color.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.color.dimensions()
    }
}

/// Capability consumed by the matcher: "give me the template called X".
pub trait TemplateProvider: Send + Sync {
    fn template(&self, name: &str) -> Option<Arc<Template>>;

    /// True if the template is (or could be) loaded.
    fn is_loaded(&self, name: &str) -> bool {
        self.template(name).is_some()
    }

    /// Load every name up front. Returns how many are available.
    fn preload(&self, names: &[&str]) -> usize {
        names
            .iter()
            .filter(|name| self.template(name).is_some())
            .count()
    }
}

/// Loads templates from `<root>/<category>/<name>.png` on first use and keeps
/// them for the lifetime of the process.
///
/// A name that failed to load is remembered as missing so the warning is
/// logged once and the disk is not hit again; `clear_cache` forgets both.
pub struct TemplateLibrary {
    root: PathBuf,
    cache: RwLock<HashMap<String, Arc<Template>>>,
    missing: Mutex<HashSet<String>>,
}

impl TemplateLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: RwLock::new(HashMap::new()),
            missing: Mutex::new(HashSet::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a template name to a file, appending `.png` unless the name
    /// already carries an image extension.
    pub fn template_path(&self, name: &str) -> PathBuf {
        let has_extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));

        if has_extension {
            self.root.join(name)
        } else {
            self.root.join(format!("{name}.png"))
        }
    }

    /// Get a template, loading it from disk on first use.
    pub fn load(&self, name: &str) -> Option<Arc<Template>> {
        if let Some(template) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Some(Arc::clone(template));
        }

        if self.lock_missing().contains(name) {
            return None;
        }

        match self.read_template(name) {
            Ok(template) => {
                log::debug!(
                    "Loaded template: {} ({}x{})",
                    name,
                    template.width(),
                    template.height()
                );
                let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
                // Another thread may have won the race; keep its instance
                let entry = cache
                    .entry(name.to_string())
                    .or_insert_with(|| Arc::new(template));
                Some(Arc::clone(entry))
            }
            Err(e) => {
                if self.lock_missing().insert(name.to_string()) {
                    log::warn!("{e}");
                }
                None
            }
        }
    }

    /// Register a template that does not live on disk.
    pub fn insert(&self, template: Template) -> Arc<Template> {
        let name = template.name().to_string();
        let template = Arc::new(template);
        self.lock_missing().remove(&name);
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, Arc::clone(&template));
        template
    }

    /// Load a batch of templates into the cache.
    pub fn preload(&self, names: &[&str]) -> usize {
        let loaded = names
            .iter()
            .filter(|name| self.load(name).is_some())
            .count();
        log::info!("Preloaded {}/{} templates", loaded, names.len());
        loaded
    }

    /// True if the template is in the cache. Never touches the disk.
    pub fn is_cached(&self, name: &str) -> bool {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Names currently in the cache, sorted
    pub fn cached_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Forget every loaded template and every remembered miss.
    pub fn clear_cache(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.lock_missing().clear();
        log::debug!("Template cache cleared");
    }

    fn lock_missing(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.missing.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_template(&self, name: &str) -> PerceptionResult<Template> {
        let path = self.template_path(name);
        if !path.is_file() {
            return Err(PerceptionError::TemplateNotFound { path });
        }

        let image = image::open(&path)
            .map_err(|source| PerceptionError::TemplateDecodeFailed {
                path: path.clone(),
                source,
            })?
            .to_rgb8();

        Template::from_image(name, image)
    }
}

impl TemplateProvider for TemplateLibrary {
    fn template(&self, name: &str) -> Option<Arc<Template>> {
        self.load(name)
    }

    fn is_loaded(&self, name: &str) -> bool {
        self.load(name).is_some()
    }

    fn preload(&self, names: &[&str]) -> usize {
        TemplateLibrary::preload(self, names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::write_template;
    use image::Rgb;

    #[test]
    fn test_template_path_appends_extension() {
        let library = TemplateLibrary::new("assets/templates");

        assert_eq!(
            library.template_path("screens/main_menu"),
            PathBuf::from("assets/templates/screens/main_menu.png")
        );
        assert_eq!(
            library.template_path("npcs/akara.jpg"),
            PathBuf::from("assets/templates/npcs/akara.jpg")
        );
    }

    #[test]
    fn test_load_caches_template() {
        let dir = tempfile::tempdir().unwrap();
        let image = RgbImage::from_pixel(6, 4, Rgb([200, 100, 50]));
        write_template(dir.path(), "hud/belt", &image);

        let library = TemplateLibrary::new(dir.path());
        let first = library.load("hud/belt").expect("template should load");
        let second = library.load("hud/belt").expect("template should stay cached");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.dimensions(), (6, 4));
        assert_eq!(first.category(), Some("hud"));
        assert_eq!(first.gray().dimensions(), (6, 4));
        assert_eq!(library.cached_names(), vec!["hud/belt".to_string()]);
    }

    #[test]
    fn test_missing_template_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let library = TemplateLibrary::new(dir.path());

        assert!(library.load("screens/nope").is_none());
        // Second lookup is served from the miss set
        assert!(library.load("screens/nope").is_none());
        assert!(!library.is_cached("screens/nope"));
    }

    #[test]
    fn test_corrupt_template_is_none() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("screens")).unwrap();
        std::fs::write(dir.path().join("screens/broken.png"), b"not a png").unwrap();

        let library = TemplateLibrary::new(dir.path());
        assert!(library.load("screens/broken").is_none());
    }

    #[test]
    fn test_clear_cache_allows_late_assets() {
        let dir = tempfile::tempdir().unwrap();
        let library = TemplateLibrary::new(dir.path());
        assert!(library.load("hud/minimap").is_none());

        write_template(dir.path(), "hud/minimap", &RgbImage::new(3, 3));
        assert!(library.load("hud/minimap").is_none());

        library.clear_cache();
        assert!(library.load("hud/minimap").is_some());
    }

    #[test]
    fn test_preload_counts_available() {
        let dir = tempfile::tempdir().unwrap();
        write_template(dir.path(), "screens/death", &RgbImage::new(4, 4));
        write_template(dir.path(), "screens/loading", &RgbImage::new(4, 4));

        let library = TemplateLibrary::new(dir.path());
        let loaded = library.preload(&["screens/death", "screens/loading", "screens/lobby"]);

        assert_eq!(loaded, 2);
        assert!(library.is_cached("screens/death"));
    }

    #[test]
    fn test_insert_registers_template() {
        let library = TemplateLibrary::new("does/not/exist");
        let template = Template::from_image("buttons/ok", RgbImage::new(2, 2)).unwrap();
        library.insert(template);

        assert!(library.load("buttons/ok").is_some());
    }

    #[test]
    fn test_empty_template_rejected() {
        assert!(matches!(
            Template::from_image("x", RgbImage::new(0, 3)),
            Err(PerceptionError::EmptyTemplate { .. })
        ));
    }
}
