//! Grid Points Setup dialog.

use super::{Ctx, InmDriver};
use crate::automation::{Action, ControlSpec, UiBackend, WindowId, WindowQuery};
use crate::error::{DriverError, Result};
use crate::model::{Coordinates, GridSetup, Threshold};
use tracing::{debug, warn};

impl<B: UiBackend> InmDriver<B> {
    /// Open the grid dialog for the first scenario and delete every existing grid.
    pub fn open_grid_setup(&mut self) -> Result<()> {
        self.with_retry("open_grid_setup", |ctx| ctx.open_grid_setup())
    }

    /// Add one grid record to the open grid dialog.
    pub fn set_grid(&mut self, grid: &GridSetup) -> Result<()> {
        grid.validate().map_err(DriverError::InvalidOptions)?;
        self.with_retry("set_grid", |ctx| ctx.set_grid(grid))
    }
}

impl<B: UiBackend> Ctx<'_, B> {
    /// Pick the first entry of a selection dialog and confirm it.
    pub fn confirm_select(&mut self, title: &str) -> Result<()> {
        let select = self.ui.find_window(&WindowQuery::exact(title))?;
        self.select_index(select, &ControlSpec::list_box(), 0)?;
        self.click(select, &ControlSpec::button("OK"))
    }

    fn open_grid_setup(&mut self) -> Result<()> {
        self.close_all_windows()?;
        self.click_menu_item("Run->Grid Setup...")?;
        self.confirm_select("Scenario Select")?;
        self.cascade()?;

        let dialog = self.ui.top_window()?;
        let list = self.locate(dialog, &ControlSpec::list_box())?;
        self.ui.invoke(list, &Action::Focus)?;
        let existing = self.ui.item_texts(list)?.len();
        for _ in 0..existing {
            self.click_menu_item("Edit->Delete Records")?;
        }
        debug!(existing, "grid records deleted");
        Ok(())
    }

    fn set_grid(&mut self, grid: &GridSetup) -> Result<()> {
        let dialog = self.ui.top_window()?;
        self.click_menu_item("Edit->Add Record")?;
        // "Grip" is the dialog's own spelling
        self.select_text(dialog, &ControlSpec::combo("Grip Type"), grid.grid_type.label())?;

        match grid.threshold {
            Threshold::Relative(delta) => {
                self.click(dialog, &ControlSpec::radio("Relative Threshold"))?;
                self.set_text(dialog, &ControlSpec::edit("Ambient + Delta (dB)"), &delta.to_string())?;
            }
            Threshold::Fixed(level) => {
                self.click(dialog, &ControlSpec::radio("Fixed Threshold (dB)"))?;
                self.set_text(dialog, &ControlSpec::edit("Fixed Threshold (dB)"), &level.to_string())?;
            }
        }

        self.set_percent_of_time(dialog, grid.do_percent_of_time)?;

        if grid.grid_type.has_extent() {
            match grid.coordinates {
                Coordinates::XY => {
                    self.click(dialog, &ControlSpec::radio("X/Y"))?;
                    self.set_text(dialog, &ControlSpec::edit("X (nmi)"), &grid.x.to_string())?;
                    self.set_text(dialog, &ControlSpec::edit("Y (nmi)"), &grid.y.to_string())?;
                    self.set_text(dialog, &ControlSpec::edit("I (nmi)"), &grid.i.to_string())?;
                    self.set_text(dialog, &ControlSpec::edit("J (nmi)"), &grid.j.to_string())?;
                }
                Coordinates::LatLong => {
                    warn!("lat/long grid coordinates are not supported, origin left unchanged");
                }
            }
            self.set_text(
                dialog,
                &ControlSpec::edit("Grid Rotation Angle (deg)"),
                &grid.grid_rotation_angle.to_string(),
            )?;
        }

        if grid.grid_type.has_points() {
            let id = grid.grid_id.as_deref().unwrap_or_default();
            self.set_text(dialog, &ControlSpec::edit("Grid Id"), id)?;
            self.set_text(dialog, &ControlSpec::edit("I"), &grid.nb_pts_i.to_string())?;
            self.set_text(dialog, &ControlSpec::edit("J"), &grid.nb_pts_j.to_string())?;
        }
        Ok(())
    }

    fn set_percent_of_time(&mut self, dialog: WindowId, hours: Option<f64>) -> Result<()> {
        let check_box = ControlSpec::check_box("Do Percent of Time (hr)");
        match hours {
            Some(hours) => {
                let control = self.locate(dialog, &check_box)?;
                if !self.ui.is_checked(control)? {
                    self.ui.invoke(control, &Action::Click)?;
                }
                self.set_text(dialog, &ControlSpec::edit("Do Percent of Time (hr)"), &hours.to_string())
            }
            None => self.act(dialog, &check_box, Action::Uncheck),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::model::GridType;
    use proptest::prelude::*;

    fn standard_grid() -> GridSetup {
        GridSetup {
            grid_type: GridType::Standard,
            grid_id: Some("G1".into()),
            ..GridSetup::default()
        }
    }

    #[test]
    fn grid_setup_deletes_each_existing_record() {
        let mut driver = driver_with_study();
        ui(&mut driver).set_items(ControlSpec::list_box(), &["A", "B", "C"]);
        driver.open_grid_setup().unwrap();
        let ui = driver.backend();
        assert_eq!(ui.menu_count("Edit->Delete Records"), 3);
        assert_eq!(
            ui.menus_invoked()[..3],
            ["Window->Close All", "Run->Grid Setup...", "Window->Cascade"]
        );
        assert_eq!(
            ui.actions_on(&ControlSpec::button("OK")),
            vec![Action::Click]
        );
    }

    #[test]
    fn fixed_threshold_never_touches_relative_controls() {
        let mut driver = driver_with_study();
        driver.set_grid(&standard_grid()).unwrap();
        let ui = driver.backend();
        assert_eq!(ui.texts_set(&ControlSpec::edit("Fixed Threshold (dB)")), vec!["85"]);
        assert!(!ui.touched("Relative Threshold"));
        assert!(!ui.touched("Ambient + Delta (dB)"));
    }

    #[test]
    fn relative_threshold_never_touches_fixed_controls() {
        let mut driver = driver_with_study();
        let grid = GridSetup {
            threshold: Threshold::Relative(10.0),
            ..standard_grid()
        };
        driver.set_grid(&grid).unwrap();
        let ui = driver.backend();
        assert_eq!(ui.texts_set(&ControlSpec::edit("Ambient + Delta (dB)")), vec!["10"]);
        assert!(!ui.touched("Fixed Threshold (dB)"));
    }

    fn any_grid() -> impl Strategy<Value = GridSetup> {
        (
            prop_oneof![
                Just(GridType::Location),
                Just(GridType::Contour),
                Just(GridType::Standard),
                Just(GridType::Detailed),
            ],
            prop_oneof![Just(Coordinates::XY), Just(Coordinates::LatLong)],
            any::<bool>(),
            -20.0f64..120.0,
            proptest::option::of(0.5f64..24.0),
            1u32..50,
            1u32..50,
        )
            .prop_map(|(grid_type, coordinates, relative, db, hours, nb_pts_i, nb_pts_j)| GridSetup {
                grid_type,
                grid_id: Some("G1".into()),
                coordinates,
                nb_pts_i,
                nb_pts_j,
                threshold: if relative {
                    Threshold::Relative(db)
                } else {
                    Threshold::Fixed(db)
                },
                do_percent_of_time: hours,
                ..GridSetup::default()
            })
    }

    proptest! {
        #[test]
        fn exactly_one_threshold_is_entered(grid in any_grid()) {
            let mut driver = driver_with_study();
            prop_assert!(driver.set_grid(&grid).is_ok());
            let ui = driver.backend();
            let relative = ui.touched("Relative Threshold") || ui.touched("Ambient + Delta (dB)");
            let fixed = ui.touched("Fixed Threshold (dB)");
            prop_assert!(relative != fixed);
            let (edit, db) = match grid.threshold {
                Threshold::Relative(db) => ("Ambient + Delta (dB)", db),
                Threshold::Fixed(db) => ("Fixed Threshold (dB)", db),
            };
            prop_assert_eq!(ui.texts_set(&ControlSpec::edit(edit)), vec![db.to_string()]);
        }
    }

    #[test]
    fn standard_grid_sets_extent_and_points() {
        let mut driver = driver_with_study();
        driver.set_grid(&standard_grid()).unwrap();
        let ui = driver.backend();
        assert_eq!(
            ui.actions_on(&ControlSpec::combo("Grip Type")),
            vec![Action::SelectText("Standard".into())]
        );
        assert_eq!(ui.texts_set(&ControlSpec::edit("X (nmi)")), vec!["-8"]);
        assert_eq!(ui.texts_set(&ControlSpec::edit("I (nmi)")), vec!["16"]);
        assert_eq!(ui.texts_set(&ControlSpec::edit("Grid Id")), vec!["G1"]);
        assert_eq!(ui.texts_set(&ControlSpec::edit("J")), vec!["2"]);
        assert_eq!(
            ui.actions_on(&ControlSpec::check_box("Do Percent of Time (hr)")),
            vec![Action::Uncheck]
        );
    }

    #[test]
    fn location_grid_sets_only_type_and_threshold() {
        let mut driver = driver_with_study();
        driver.set_grid(&GridSetup::default()).unwrap();
        let ui = driver.backend();
        assert!(!ui.touched("X (nmi)"));
        assert!(!ui.touched("Grid Rotation Angle (deg)"));
        assert!(!ui.touched("Grid Id"));
    }

    #[test]
    fn lat_long_leaves_origin_untouched() {
        let mut driver = driver_with_study();
        let grid = GridSetup {
            grid_type: GridType::Contour,
            coordinates: Coordinates::LatLong,
            ..GridSetup::default()
        };
        driver.set_grid(&grid).unwrap();
        let ui = driver.backend();
        assert!(!ui.touched("X/Y"));
        assert!(!ui.touched("X (nmi)"));
        assert!(ui.touched("Grid Rotation Angle (deg)"));
    }

    #[test]
    fn percent_of_time_ticks_box_only_when_unticked() {
        let mut driver = driver_with_study();
        let check_box = ControlSpec::check_box("Do Percent of Time (hr)");
        ui(&mut driver).control(check_box.clone()).checked = true;
        let grid = GridSetup {
            do_percent_of_time: Some(12.5),
            ..GridSetup::default()
        };
        driver.set_grid(&grid).unwrap();
        let ui = driver.backend();
        assert!(ui.actions_on(&check_box).is_empty());
        assert_eq!(
            ui.texts_set(&ControlSpec::edit("Do Percent of Time (hr)")),
            vec!["12.5"]
        );
    }

    #[test]
    fn one_lookup_failure_reruns_set_grid_once() {
        let mut driver = driver_with_study();
        ui(&mut driver).fail_locate(ControlSpec::edit("X (nmi)"), 1);
        driver.set_grid(&standard_grid()).unwrap();
        let ui = driver.backend();
        assert_eq!(ui.menu_count("Window->Close All"), 1);
        assert_eq!(ui.menu_count("Edit->Add Record"), 2);
        // same arguments on both attempts
        assert_eq!(
            ui.actions_on(&ControlSpec::combo("Grip Type")),
            vec![
                Action::SelectText("Standard".into()),
                Action::SelectText("Standard".into())
            ]
        );
        assert_eq!(ui.texts_set(&ControlSpec::edit("X (nmi)")), vec!["-8"]);
    }

    #[test]
    fn invalid_grid_is_rejected_before_touching_the_dialog() {
        let mut driver = driver_with_study();
        let grid = GridSetup {
            grid_id: None,
            ..standard_grid()
        };
        let err = driver.set_grid(&grid).unwrap_err();
        assert!(matches!(err, DriverError::InvalidOptions(_)));
        assert!(driver.backend().calls.is_empty());
    }
}
