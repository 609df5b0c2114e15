//! Structural model of unified diffs (C3): hunks, file-patches, patch-sets.
//! Ported from `patch/types.py`.

/// One line of a hunk body: ` ` (context), `-` (removal), `+` (addition).
pub type HunkLine = (char, String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<HunkLine>,
    /// Trailing function-context string from the `@@ ... @@ context` header.
    pub context: String,
}

impl Hunk {
    pub fn count_context(&self) -> usize {
        self.lines.iter().filter(|(p, _)| *p == ' ').count()
    }

    pub fn count_removals(&self) -> usize {
        self.lines.iter().filter(|(p, _)| *p == '-').count()
    }

    pub fn count_additions(&self) -> usize {
        self.lines.iter().filter(|(p, _)| *p == '+').count()
    }

    /// Recompute `(old_count, new_count)` from the line list.
    pub fn compute_counts(&self) -> (usize, usize) {
        (self.count_context() + self.count_removals(), self.count_context() + self.count_additions())
    }

    /// Return a copy with `old_count`/`new_count` recomputed from the lines.
    pub fn with_recomputed_counts(&self) -> Hunk {
        let (old_count, new_count) = self.compute_counts();
        Hunk { old_count, new_count, ..self.clone() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchFile {
    pub old_path: String,
    pub new_path: String,
    pub hunks: Vec<Hunk>,
    pub is_new_file: bool,
    pub is_deleted: bool,
}

impl PatchFile {
    /// Effective path: `new_path` for edits/creates, `old_path` for deletions.
    pub fn path(&self) -> &str {
        if self.is_deleted { &self.old_path } else { &self.new_path }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatchSet {
    pub file_patches: Vec<PatchFile>,
}

impl PatchSet {
    pub fn get_file(&self, path: &str) -> Option<&PatchFile> {
        self.file_patches.iter().find(|f| f.path() == path)
    }

    pub fn file_paths(&self) -> Vec<&str> {
        self.file_patches.iter().map(|f| f.path()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recomputes_counts_from_lines() {
        let hunk = Hunk {
            old_start: 1,
            old_count: 99,
            new_start: 1,
            new_count: 99,
            lines: vec![
                (' ', "a".to_string()),
                ('-', "b".to_string()),
                ('+', "c".to_string()),
                ('+', "d".to_string()),
            ],
            context: String::new(),
        };
        assert_eq!(hunk.compute_counts(), (2, 3));
    }

    #[test]
    fn path_reflects_deletion() {
        let pf = PatchFile {
            old_path: "a.rs".into(),
            new_path: "a.rs".into(),
            hunks: vec![],
            is_new_file: false,
            is_deleted: true,
        };
        assert_eq!(pf.path(), "a.rs");
    }
}
