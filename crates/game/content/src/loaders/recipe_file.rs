//! Administrative edits of the recipe file.
//!
//! Edits are textual where possible so that comments and layout written by
//! server owners survive. The in-memory store only sees the change after a
//! reload.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use beacon_core::Recipe;
use serde::Serialize;
use toml::{Table, Value};

use crate::loaders::recipes::RawRecipe;
use crate::loaders::{LoadResult, read_file};

/// `[recipes.<id>]` wrapper used to serialize a single new recipe.
#[derive(Serialize)]
struct RecipeDocument<'a> {
    recipes: BTreeMap<&'a str, &'a RawRecipe>,
}

/// Handle on the recipe definition file.
#[derive(Clone, Debug)]
pub struct RecipeFile {
    path: PathBuf,
}

impl RecipeFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `recipe` to the file, creating it if needed.
    ///
    /// # Errors
    ///
    /// Fails if the id is not a bare TOML key, if a recipe with the same id
    /// already exists, or on I/O errors.
    pub fn create(&self, recipe: &Recipe) -> LoadResult<()> {
        if !is_bare_key(&recipe.id) {
            anyhow::bail!(
                "Invalid recipe id '{}': use letters, digits, '-' and '_' only",
                recipe.id
            );
        }

        let content = self.read_or_empty()?;
        let table = parse_table(&content)?;
        if recipe_table(&table).is_some_and(|recipes| recipes.contains_key(&recipe.id)) {
            anyhow::bail!("Recipe '{}' already exists", recipe.id);
        }

        let raw = RawRecipe::from_recipe(recipe);
        let document = RecipeDocument {
            recipes: [(recipe.id.as_str(), &raw)].into_iter().collect(),
        };
        let snippet = toml::to_string(&document)
            .map_err(|e| anyhow::anyhow!("Failed to serialize recipe '{}': {}", recipe.id, e))?;

        let mut updated = content;
        if !updated.is_empty() && !updated.ends_with('\n') {
            updated.push('\n');
        }
        if !updated.is_empty() {
            updated.push('\n');
        }
        updated.push_str(&snippet);

        self.write(&updated)?;
        tracing::debug!(id = %recipe.id, path = %self.path.display(), "recipe created");
        Ok(())
    }

    /// Sets `enabled` on an existing recipe.
    ///
    /// Only the recipe's own section is edited. When that section cannot be
    /// found textually (inline or dotted definitions), the whole file is
    /// rewritten from its parsed form and comments are lost.
    pub fn set_enabled(&self, id: &str, enabled: bool) -> LoadResult<()> {
        let content = read_file(&self.path)?;
        let table = parse_table(&content)?;
        if !recipe_table(&table).is_some_and(|recipes| recipes.contains_key(id)) {
            anyhow::bail!("Unknown recipe '{}'", id);
        }

        let edited = edit_enabled_line(&content, id, enabled)
            .filter(|edited| enabled_value(edited, id) == Some(enabled));

        let updated = match edited {
            Some(edited) => edited,
            None => {
                tracing::warn!(
                    "Could not locate [recipes.{}] in {}, rewriting the whole file",
                    id,
                    self.path.display()
                );
                rewrite_enabled(table, id, enabled)?
            }
        };

        self.write(&updated)?;
        tracing::debug!(id, enabled, "recipe toggled");
        Ok(())
    }

    fn read_or_empty(&self) -> LoadResult<String> {
        if self.path.exists() {
            read_file(&self.path)
        } else {
            Ok(String::new())
        }
    }

    fn write(&self, content: &str) -> LoadResult<()> {
        let temp_path = self.path.with_extension("toml.tmp");
        std::fs::write(&temp_path, content)
            .map_err(|e| anyhow::anyhow!("Failed to write file {}: {}", temp_path.display(), e))?;

        // Atomic rename
        std::fs::rename(&temp_path, &self.path)
            .map_err(|e| anyhow::anyhow!("Failed to replace file {}: {}", self.path.display(), e))
    }
}

fn is_bare_key(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn parse_table(content: &str) -> LoadResult<Table> {
    toml::from_str(content).map_err(|e| anyhow::anyhow!("Failed to parse recipes TOML: {}", e))
}

fn recipe_table(table: &Table) -> Option<&Table> {
    table.get("recipes").and_then(Value::as_table)
}

fn enabled_value(content: &str, id: &str) -> Option<bool> {
    let table = parse_table(content).ok()?;
    recipe_table(&table)?
        .get(id)?
        .get("enabled")
        .and_then(Value::as_bool)
        .or(Some(true))
}

/// Rewrites or inserts the `enabled` line inside `[recipes.<id>]`.
fn edit_enabled_line(content: &str, id: &str, enabled: bool) -> Option<String> {
    let headers = [format!("[recipes.{id}]"), format!("[recipes.\"{id}\"]")];
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();

    let start = lines
        .iter()
        .position(|line| headers.iter().any(|header| strip_comment(line) == header))?;
    let end = lines[start + 1..]
        .iter()
        .position(|line| line.trim_start().starts_with('['))
        .map_or(lines.len(), |offset| start + 1 + offset);

    let replacement = format!("enabled = {enabled}");
    let existing = (start + 1..end).find(|&index| {
        let key = strip_comment(&lines[index]);
        key.split_once('=')
            .is_some_and(|(key, _)| key.trim() == "enabled")
    });

    match existing {
        Some(index) => {
            let line = &lines[index];
            let indent: String = line.chars().take_while(|c| c.is_whitespace()).collect();
            let comment = comment_start(line).map_or("", |at| &line[at..]);
            lines[index] = if comment.is_empty() {
                format!("{indent}{replacement}")
            } else {
                format!("{indent}{replacement} {comment}")
            };
        }
        None => lines.insert(start + 1, replacement),
    }

    let mut updated = lines.join("\n");
    if content.ends_with('\n') {
        updated.push('\n');
    }
    Some(updated)
}

fn strip_comment(line: &str) -> &str {
    comment_start(line).map_or(line, |at| &line[..at]).trim()
}

/// Byte offset of the `#` starting a comment, ignoring `#` inside strings.
fn comment_start(line: &str) -> Option<usize> {
    let mut quote = None;
    let mut escaped = false;
    for (index, c) in line.char_indices() {
        match quote {
            Some('"') if escaped => escaped = false,
            Some('"') if c == '\\' => escaped = true,
            Some(open) if c == open => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '#' => return Some(index),
            None => {}
        }
    }
    None
}

fn rewrite_enabled(mut table: Table, id: &str, enabled: bool) -> LoadResult<String> {
    let recipe = table
        .get_mut("recipes")
        .and_then(Value::as_table_mut)
        .and_then(|recipes| recipes.get_mut(id))
        .and_then(Value::as_table_mut)
        .ok_or_else(|| anyhow::anyhow!("Unknown recipe '{}'", id))?;
    recipe.insert("enabled".to_string(), Value::Boolean(enabled));
    toml::to_string(&table).map_err(|e| anyhow::anyhow!("Failed to serialize recipes: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::RecipeLoader;
    use beacon_core::{
        EffectKind, ExpCostCalculator, InputShape, LevelOp, Modification, RecipeAction,
        SpecialOperation, StationType, VirtualEffectSet,
    };

    const HAND_WRITTEN: &str = "# Server recipes, edit with care
[recipes.luck] # lucky charm
type = \"smithing-table\"
exp-cost = 4

[recipes.luck.input]
item = \"rabbit_foot\"
amount = 1

[[recipes.luck.modifications]]
action = \"add\"
effects = { luck = 1 }

# disabled until the next season
[recipes.haste]
type = \"anvil\"
  enabled = false # keep off
exp-cost = 1

[recipes.haste.input]
item = \"golden_pickaxe\"

[[recipes.haste.modifications]]
action = \"set\"
effects = { haste = 2 }
";

    fn write_file(content: &str) -> (tempfile::TempDir, RecipeFile) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recipes.toml");
        std::fs::write(&path, content).unwrap();
        (dir, RecipeFile::new(path))
    }

    fn enabled(file: &RecipeFile, id: &str) -> bool {
        RecipeLoader::load(file.path())
            .unwrap()
            .into_iter()
            .find(|recipe| recipe.id == id)
            .unwrap()
            .enabled
    }

    fn glowing_recipe(id: &str) -> Recipe {
        Recipe {
            id: id.to_string(),
            station: StationType::Anvil,
            input: Some(InputShape::new("glow_ink_sac", 4)),
            action: RecipeAction::Modify {
                modifications: vec![Modification::new(
                    LevelOp::Add,
                    VirtualEffectSet::from_effects([(EffectKind::Glowing, 1)]),
                )],
                special_operations: vec![SpecialOperation::SetOwner],
            },
            exp_cost: ExpCostCalculator::Fixed(2),
            enabled: true,
        }
    }

    #[test]
    fn set_enabled_preserves_comments() {
        let (_dir, file) = write_file(HAND_WRITTEN);

        file.set_enabled("haste", true).unwrap();
        file.set_enabled("luck", false).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.starts_with("# Server recipes, edit with care\n"));
        assert!(content.contains("# disabled until the next season"));
        assert!(content.contains("[recipes.luck] # lucky charm\nenabled = false\n"));
        assert!(content.contains("  enabled = true # keep off\n"));
        assert!(enabled(&file, "haste"));
        assert!(!enabled(&file, "luck"));
    }

    #[test]
    fn hash_inside_strings_is_not_a_comment() {
        assert_eq!(strip_comment("item = \"dye#1\" # red"), "item = \"dye#1\"");
        assert_eq!(strip_comment("name = 'a#b'"), "name = 'a#b'");
        assert_eq!(strip_comment("note = \"say \\\"#\\\"\" #"), "note = \"say \\\"#\\\"\"");
        assert_eq!(comment_start("enabled = true # off"), Some(15));
        assert_eq!(comment_start("[recipes.\"x#y\"]"), None);
    }

    #[test]
    fn set_enabled_handles_hash_in_quoted_ids() {
        let (_dir, file) = write_file(
            "# keep me
[recipes.\"lucky#charm\"] # quoted id
type = \"anvil\"
enabled = true # \"#\" in a comment
exp-cost = 1

[recipes.\"lucky#charm\".input]
item = \"rabbit_foot\"

[[recipes.\"lucky#charm\".modifications]]
action = \"add\"
effects = { luck = 1 }
",
        );

        file.set_enabled("lucky#charm", false).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.starts_with("# keep me\n"));
        assert!(content.contains("enabled = false # \"#\" in a comment\n"));
        assert!(!enabled(&file, "lucky#charm"));
    }

    #[test]
    fn writes_leave_no_temporary_file() {
        let (dir, file) = write_file(HAND_WRITTEN);

        file.set_enabled("luck", false).unwrap();
        file.create(&glowing_recipe("glowing")).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("recipes.toml")]);
    }

    #[test]
    fn set_enabled_rejects_unknown_recipes() {
        let (_dir, file) = write_file(HAND_WRITTEN);
        assert!(file.set_enabled("flight", true).is_err());
    }

    #[test]
    fn set_enabled_falls_back_to_rewrite() {
        let (_dir, file) = write_file(
            "recipes.inline = { type = \"anvil\", kind = \"combination\", exp-cost = 1 }\n",
        );

        file.set_enabled("inline", false).unwrap();

        assert!(!enabled(&file, "inline"));
    }

    #[test]
    fn create_appends_and_rejects_duplicates() {
        let (_dir, file) = write_file(HAND_WRITTEN);

        file.create(&glowing_recipe("glowing")).unwrap();
        assert!(file.create(&glowing_recipe("glowing")).is_err());
        assert!(file.create(&glowing_recipe("bad id")).is_err());

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.starts_with(HAND_WRITTEN));
        let recipes = RecipeLoader::load(file.path()).unwrap();
        assert_eq!(recipes.len(), 3);
        assert_eq!(recipes[2], glowing_recipe("glowing"));
    }

    #[test]
    fn create_makes_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = RecipeFile::new(dir.path().join("recipes.toml"));

        file.create(&glowing_recipe("glowing")).unwrap();

        let recipes = RecipeLoader::load(file.path()).unwrap();
        assert_eq!(recipes, vec![glowing_recipe("glowing")]);
    }
}
