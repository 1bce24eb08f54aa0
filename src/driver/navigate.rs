//! Folder navigation in the tool's legacy file dialogs.
//!
//! Those dialogs have no path field: a folder is reached by picking each
//! directory from a list box and pressing ENTER, starting from the drive.

use super::Ctx;
use crate::automation::{Action, ControlSpec, UiBackend, WindowId};
use crate::error::{DriverError, Result};

fn is_separator(c: char) -> bool {
    c == '\\' || c == '/'
}

/// Split a path into the entries to pick, in order.
///
/// The path is lower-cased (list box entries are compared case-insensitively)
/// and the drive keeps its trailing backslash, since the dialog lists it as `c:\`.
pub fn directory_segments(path: &str) -> Vec<String> {
    let lowered = path.to_lowercase().replace('/', "\\");
    let mut segments: Vec<String> = lowered
        .trim_end_matches('\\')
        .split('\\')
        .map(str::to_string)
        .collect();
    if let Some(drive) = segments.first_mut() {
        drive.push('\\');
    }
    segments
}

/// Last component of a study path.
pub fn study_folder_name(path: &str) -> String {
    path.trim_end_matches(is_separator)
        .rsplit(is_separator)
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Index of `segment` in a list box listing, ignoring case.
pub fn find_item(items: &[String], segment: &str) -> Option<usize> {
    let wanted = segment.to_lowercase();
    items.iter().position(|item| item.to_lowercase() == wanted)
}

impl<B: UiBackend> Ctx<'_, B> {
    /// Walk `segments` in the list box of `window`: select each entry and press ENTER.
    pub fn navigate(&mut self, window: WindowId, list: &ControlSpec, segments: &[String]) -> Result<()> {
        for segment in segments {
            let control = self.ui.locate(window, list)?;
            let items = self.ui.item_texts(control)?;
            let index = find_item(&items, segment).ok_or_else(|| DriverError::ItemNotFound {
                item: segment.clone(),
                listing: items.clone(),
            })?;
            self.ui.invoke(control, &Action::SelectIndex(index))?;
            self.ui.send_keys(window, "{ENTER}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rejoin(segments: &[String]) -> String {
        format!("{}{}", segments[0], segments[1..].join("\\"))
    }

    #[test]
    fn segments_keep_drive_separator() {
        let segs = directory_segments("C:\\INM Studies\\CS-TNN_2016-01-05_TP842");
        assert_eq!(segs, vec!["c:\\", "inm studies", "cs-tnn_2016-01-05_tp842"]);
    }

    #[test]
    fn segments_rejoin_to_lowercased_path() {
        for path in [
            "C:\\INM Studies\\Study A\\OUTPUT1\\LAMAX",
            "D:\\flights",
            "c:\\a\\b\\c",
        ] {
            assert_eq!(rejoin(&directory_segments(path)), path.to_lowercase());
        }
    }

    proptest! {
        #[test]
        fn any_drive_path_rejoins_to_itself_lowercased(
            drive in "[a-zA-Z]",
            dirs in proptest::collection::vec("[A-Za-z0-9_][A-Za-z0-9 _.-]{0,11}", 0..6),
        ) {
            let path = format!("{drive}:\\{}", dirs.join("\\"));
            let segments = directory_segments(&path);
            prop_assert_eq!(segments.len(), dirs.len() + 1);
            prop_assert_eq!(rejoin(&segments), path.to_lowercase());
        }
    }

    #[test]
    fn segments_ignore_trailing_separator_and_forward_slashes() {
        assert_eq!(
            directory_segments("C:/Studies/Run1/"),
            vec!["c:\\", "studies", "run1"]
        );
    }

    #[test]
    fn folder_name_is_last_component() {
        assert_eq!(
            study_folder_name("C:\\INM Studies\\CS-TNN_2016-01-05_TP842"),
            "CS-TNN_2016-01-05_TP842"
        );
        assert_eq!(study_folder_name("/tmp/studies/A/"), "A");
    }

    #[test]
    fn items_match_case_insensitively() {
        let items: Vec<String> = ["[..]", "INM Studies", "Windows"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(find_item(&items, "inm studies"), Some(1));
        assert_eq!(find_item(&items, "program files"), None);
    }
}
