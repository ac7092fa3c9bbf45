use std::fmt;

use tracing::info;

use super::{CaseRecipe, PrepareOptions, PrepareReport, Recipe};
use crate::case::Case;
use crate::error::Result;
use crate::solution::FvSolution;

/// A recipe that runs one solver application.
#[derive(Debug, Clone, PartialEq)]
pub struct SingleCommandRecipe {
    recipe: Recipe,
    residual_fields: Vec<String>,
}

impl SingleCommandRecipe {
    pub fn new(name: impl Into<String>, application: &str) -> Result<Self> {
        let recipe = Recipe::new(name, [application])?;
        Ok(SingleCommandRecipe {
            recipe,
            residual_fields: vec!["p".to_string()],
        })
    }

    pub(crate) fn from_parts(recipe: Recipe, residual_fields: Vec<String>) -> Self {
        SingleCommandRecipe { recipe, residual_fields }
    }

    /// Applies builder calls to the wrapped recipe.
    pub fn map_recipe(mut self, edit: impl FnOnce(Recipe) -> Recipe) -> Self {
        self.recipe = edit(self.recipe);
        self
    }

    pub fn with_residual_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.residual_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn application(&self) -> &str {
        self.recipe.commands().first().map_or("", String::as_str)
    }

    pub fn log_file(&self) -> String {
        format!("{}.log", self.application())
    }

    pub fn err_file(&self) -> String {
        format!("{}.err", self.application())
    }

    pub fn residual_fields(&self) -> &[String] {
        &self.residual_fields
    }

    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    /// Points the case's controlDict at this application. A changed
    /// controlDict is always rewritten; an unchanged one is saved like any
    /// other document, so a new case still gets one.
    pub(crate) fn sync_control_dict(
        &self,
        case: &mut Case,
        options: PrepareOptions,
        report: &mut PrepareReport,
    ) -> Result<()> {
        let overwrite = if case.control_dict.application() == Some(self.application()) {
            options.overwrite
        } else {
            info!(application = self.application(), "updating controlDict");
            case.control_dict.set_application(self.application());
            true
        };
        let project_dir = case.project_dir().to_path_buf();
        report.save(case.control_dict.foam_file(), &project_dir, overwrite)
    }

    /// Runs the preparation, letting `adjust` edit the synchronized solution document first.
    pub(crate) fn prepare_with(
        &self,
        case: &mut Case,
        options: PrepareOptions,
        adjust: impl FnOnce(&mut FvSolution, &Case) -> Result<()>,
    ) -> Result<PrepareReport> {
        let mut report = PrepareReport::default();
        self.sync_control_dict(case, options, &mut report)?;
        let mut solution = self.recipe.synchronized_solution();
        if let Some(solution) = solution.as_mut() {
            adjust(solution, case)?;
        }
        self.recipe
            .prepare_case_with_solution(case, options, solution, report)
    }

    pub fn prepare_case(&self, case: &mut Case, options: PrepareOptions) -> Result<PrepareReport> {
        self.prepare_with(case, options, |_, _| Ok(()))
    }
}

impl fmt::Display for SingleCommandRecipe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.recipe, f)
    }
}

impl CaseRecipe for SingleCommandRecipe {
    fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    fn application(&self) -> Option<&str> {
        Some(SingleCommandRecipe::application(self))
    }

    fn residual_fields(&self) -> &[String] {
        &self.residual_fields
    }

    fn prepare_case(&self, case: &mut Case, options: PrepareOptions) -> Result<PrepareReport> {
        SingleCommandRecipe::prepare_case(self, case, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn log_names_follow_application() {
        let recipe = SingleCommandRecipe::new("potential", "potentialFoam").unwrap();
        assert_eq!(recipe.application(), "potentialFoam");
        assert_eq!(recipe.log_file(), "potentialFoam.log");
        assert_eq!(recipe.err_file(), "potentialFoam.err");
        assert_eq!(recipe.residual_fields(), ["p"]);
        assert!(SingleCommandRecipe::new("blank", "").is_err());
    }

    #[test]
    fn control_dict_follows_the_application() {
        let dir = tempdir().unwrap();
        let mut case = Case::new("room", dir.path());
        let control_path = case.system_folder().join("controlDict");

        let simple = SingleCommandRecipe::new("simple", "simpleFoam").unwrap();
        let report = simple.prepare_case(&mut case, PrepareOptions::default()).unwrap();
        assert_eq!(report.written.first(), Some(&control_path));

        // Unchanged and already on disk: left alone.
        std::fs::write(&control_path, "hand edited").unwrap();
        let report = simple.prepare_case(&mut case, PrepareOptions::default()).unwrap();
        assert!(report.skipped.contains(&control_path));
        assert_eq!(std::fs::read_to_string(&control_path).unwrap(), "hand edited");

        let piso = SingleCommandRecipe::new("piso", "pisoFoam").unwrap();
        let report = piso.prepare_case(&mut case, PrepareOptions::default()).unwrap();
        assert_eq!(report.written.first(), Some(&control_path));
        assert_eq!(case.control_dict.application(), Some("pisoFoam"));
        let text = std::fs::read_to_string(&control_path).unwrap();
        assert!(text.contains("application     pisoFoam;"));
    }
}
