//! Extension matching with ambiguity detection.
//!
//! A [`Matcher`] is created per classified path and tried against each rule
//! in turn. Besides answering "does this file end in `.ext`", it notices
//! names like `foo.png.png` (doubled extension) or `foo.obj.txt` (extra text
//! wrapper around a text format). The first ambiguity found is kept and
//! later rules stop looking for more.

use crate::utils::path::split_extension;

/// Why a file name looks like it was saved with the wrong extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ambiguity {
    Doubled,
    ExtraText,
}

pub(super) struct Matcher<'a> {
    file_name: &'a str,
    ambiguity: Option<Ambiguity>,
}

impl<'a> Matcher<'a> {
    pub fn new(file_name: &'a str) -> Self {
        Self {
            file_name,
            ambiguity: None,
        }
    }

    #[inline]
    pub fn ambiguity(&self) -> Option<Ambiguity> {
        self.ambiguity
    }

    /// Match a single-part extension (`png`, `txt`).
    pub fn single(&mut self, expected: &str, text_based: bool) -> bool {
        let (stem, Some(ext)) = split_extension(self.file_name) else {
            return false;
        };

        if ext == expected {
            if self.ambiguity.is_none() && inner_extension(stem) == Some(expected) {
                self.ambiguity = Some(Ambiguity::Doubled);
            }
            return true;
        }

        if self.ambiguity.is_some() {
            return false;
        }

        if text_based && ext == "txt" && inner_extension(stem) == Some(expected) {
            self.ambiguity = Some(Ambiguity::ExtraText);
        }
        false
    }

    /// Match a multi-part extension (`txt.export`, `guids.txt`).
    ///
    /// Falls back to [`Matcher::single`] when `expected` has no dot.
    pub fn multipart(&mut self, expected: &str, text_based: bool) -> bool {
        let expected_dots = expected.matches('.').count();
        if expected_dots == 0 {
            return self.single(expected, text_based);
        }

        // Dot positions in the file name, last first.
        let dots: Vec<usize> = self.file_name.rmatch_indices('.').map(|(i, _)| i).collect();
        if dots.len() <= expected_dots {
            return false;
        }

        if &self.file_name[dots[expected_dots] + 1..] == expected {
            return true;
        }

        if self.ambiguity.is_some() || dots.len() <= expected_dots + 1 {
            return false;
        }

        // One trailing component too many: `name.<expected>.<actual>`
        let intended = &self.file_name[dots[expected_dots + 1] + 1..dots[0]];
        let actual = &self.file_name[dots[0] + 1..];
        if intended == expected {
            let last_part = expected.rsplit('.').next().unwrap_or(expected);
            if actual == last_part {
                self.ambiguity = Some(Ambiguity::Doubled);
            } else if actual == "txt" {
                self.ambiguity = Some(Ambiguity::ExtraText);
            }
        }
        false
    }
}

fn inner_extension(stem: &str) -> Option<&str> {
    split_extension(stem).1
}
