//! Recipe lookup in the configured search directories

use super::recipe::RECIPE_EXTENSIONS;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// How deep below a search dir recipes are looked for.
const MAX_DEPTH: usize = 3;

fn is_recipe_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| RECIPE_EXTENSIONS.contains(&e))
}

/// Resolve `name` to a recipe file.
///
/// An existing path is returned as is. Otherwise the search dirs are walked,
/// in order, for a recipe whose file name or stem equals `name`.
pub fn find_recipe(name: &str, search_dirs: &[PathBuf]) -> Option<PathBuf> {
    let direct = Path::new(name);
    if direct.is_file() {
        return Some(direct.to_path_buf());
    }

    search_dirs.iter().find_map(|dir| {
        walk(dir).find(|path| {
            path.file_name().is_some_and(|f| f == name) || path.file_stem().is_some_and(|s| s == name)
        })
    })
}

/// Every recipe below the search dirs, sorted and deduplicated.
pub fn list_recipes(search_dirs: &[PathBuf]) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = search_dirs.iter().flat_map(|dir| walk(dir)).collect();
    found.sort();
    found.dedup();
    found
}

fn walk(dir: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(dir)
        .max_depth(MAX_DEPTH)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| is_recipe_file(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("vendor")).unwrap();
        std::fs::write(dir.path().join("vendor/Foo.recipe"), "").unwrap();
        std::fs::write(dir.path().join("Bar.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();
        dir
    }

    #[test]
    fn test_find_by_stem_and_file_name() {
        let dir = setup();
        let dirs = vec![dir.path().to_path_buf()];

        assert_eq!(find_recipe("Foo", &dirs), Some(dir.path().join("vendor/Foo.recipe")));
        assert_eq!(find_recipe("Bar.json", &dirs), Some(dir.path().join("Bar.json")));
        assert_eq!(find_recipe("notes", &dirs), None);
        assert_eq!(find_recipe("Missing", &dirs), None);
    }

    #[test]
    fn test_direct_path_wins() {
        let dir = setup();
        let path = dir.path().join("Bar.json");
        assert_eq!(find_recipe(path.to_str().unwrap(), &[]), Some(path));
    }

    #[test]
    fn test_list_recipes() {
        let dir = setup();
        let found = list_recipes(&[dir.path().to_path_buf(), dir.path().to_path_buf()]);
        assert_eq!(
            found,
            vec![dir.path().join("Bar.json"), dir.path().join("vendor/Foo.recipe")]
        );
    }
}
