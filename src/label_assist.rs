//! Label assist: model selection, prediction requests and merging
//! predictions into the annotation store.
//!
//! The network calls themselves live in the session; this module decides
//! *what* to ask for and how the answer lands in the editor.

use std::collections::BTreeMap;

use boxlab_api::{
    CustomModel, ExternalModelDir, ExternalModelRequest, ImageId, ModelClass, PredictRequest,
    Prediction, ProjectDetails, TrainingJob,
};
use serde::{Deserialize, Serialize};

use crate::annotation::{Annotation, ClassId, LabelClass};
use crate::constants::DEFAULT_ASSIST_CONFIDENCE;
use crate::editor::EditorState;

// ============================================================================
// Model selection
// ============================================================================

/// Which model produces predictions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSelection {
    /// Whatever the backend considers the newest trained model.
    #[default]
    LatestTrained,
    Trained {
        job_id: i64,
        name: String,
        model_path: String,
    },
    /// A model file uploaded by the user.
    Custom {
        model_id: i64,
        name: String,
        file_path: String,
    },
    /// A model from the backend's external model folder; needs a class mapping.
    External {
        name: String,
        path: String,
        classes: Vec<ModelClass>,
    },
}

impl ModelSelection {
    pub fn is_external(&self) -> bool {
        matches!(self, ModelSelection::External { .. })
    }

    /// Stable key used on the command line (`latest`, `trained:3`,
    /// `custom:7`, `external:<path>`).
    pub fn key(&self) -> String {
        match self {
            ModelSelection::LatestTrained => "latest".to_string(),
            ModelSelection::Trained { job_id, .. } => format!("trained:{}", job_id),
            ModelSelection::Custom { model_id, .. } => format!("custom:{}", model_id),
            ModelSelection::External { path, .. } => format!("external:{}", path),
        }
    }

    /// Human-readable name for listings and logs.
    pub fn display_name(&self) -> String {
        match self {
            ModelSelection::LatestTrained => "Latest trained model".to_string(),
            ModelSelection::Trained { name, .. } | ModelSelection::Custom { name, .. } => name.clone(),
            ModelSelection::External { name, .. } => name.clone(),
        }
    }
}

/// Display label for a training job's model size code.
pub fn model_size_label(size: Option<&str>) -> &'static str {
    match size.unwrap_or("n") {
        "n" => "Nano",
        "s" => "Small",
        "m" => "Medium",
        "l" => "Large",
        "x" => "X-Large",
        _ => "Unknown",
    }
}

/// Models the user can pick from.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalogue {
    /// Completed training jobs that produced a model file.
    pub trained: Vec<TrainingJob>,
    pub custom: Vec<CustomModel>,
    pub external: Vec<ExternalModelDir>,
}

impl ModelCatalogue {
    /// Build from the project details and external model listing. Either
    /// may be missing when the backend has nothing to offer.
    pub fn new(project: Option<ProjectDetails>, external: Vec<ExternalModelDir>) -> Self {
        let (trained, custom) = match project {
            Some(project) => (
                project
                    .training_jobs
                    .into_iter()
                    .filter(TrainingJob::is_usable)
                    .collect(),
                project.custom_models,
            ),
            None => (Vec::new(), Vec::new()),
        };
        Self {
            trained,
            custom,
            external,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.trained.is_empty() && self.custom.is_empty() && self.external.is_empty()
    }

    /// Every selectable model, latest-trained first.
    pub fn selections(&self) -> Vec<ModelSelection> {
        let mut all = vec![ModelSelection::LatestTrained];
        all.extend(self.trained.iter().filter_map(|job| {
            job.model_path.as_ref().map(|path| ModelSelection::Trained {
                job_id: job.id,
                name: format!("{} ({})", job.name, model_size_label(job.model_size.as_deref())),
                model_path: path.clone(),
            })
        }));
        all.extend(self.custom.iter().map(|model| ModelSelection::Custom {
            model_id: model.id,
            name: model.name.clone(),
            file_path: model.file_path.clone(),
        }));
        for dir in &self.external {
            all.extend(dir.models.iter().map(|model| ModelSelection::External {
                name: format!("{}/{}", dir.model_dir, model.name),
                path: model.path.clone(),
                classes: model.classes.clone(),
            }));
        }
        all
    }

    /// Resolve a key produced by [`ModelSelection::key`].
    pub fn find(&self, key: &str) -> Option<ModelSelection> {
        self.selections().into_iter().find(|s| s.key() == key)
    }
}

// ============================================================================
// Class mapping
// ============================================================================

/// External-model class id to project class id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassMapping(BTreeMap<u32, ClassId>);

impl ClassMapping {
    /// Model class `i` maps to the project's `i`-th class when there is one.
    pub fn default_for(model_classes: &[ModelClass], project_classes: &[LabelClass]) -> Self {
        Self(
            model_classes
                .iter()
                .filter_map(|mc| {
                    project_classes
                        .get(mc.id as usize)
                        .map(|class| (mc.id, class.id))
                })
                .collect(),
        )
    }

    /// Map a model class, or skip it with `None`.
    pub fn set(&mut self, model_class: u32, project_class: Option<ClassId>) {
        match project_class {
            Some(id) => {
                self.0.insert(model_class, id);
            }
            None => {
                self.0.remove(&model_class);
            }
        }
    }

    pub fn get(&self, model_class: u32) -> Option<ClassId> {
        self.0.get(&model_class).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<u32, ClassId> {
        &self.0
    }
}

// ============================================================================
// Configuration and mode
// ============================================================================

/// Everything a label-assist run needs besides the image.
#[derive(Debug, Clone, PartialEq)]
pub struct AssistConfig {
    pub model: ModelSelection,
    /// Minimum prediction score in [0, 1].
    pub confidence: f64,
    /// Remove existing boxes before adding predictions.
    pub clear_existing: bool,
    pub class_mapping: ClassMapping,
    /// Keep running on every image load.
    pub persist_across_images: bool,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            model: ModelSelection::LatestTrained,
            confidence: DEFAULT_ASSIST_CONFIDENCE,
            clear_existing: true,
            class_mapping: ClassMapping::default(),
            persist_across_images: false,
        }
    }
}

impl AssistConfig {
    /// Select a model. External models get the default class mapping;
    /// other models need none.
    pub fn select_model(&mut self, model: ModelSelection, project_classes: &[LabelClass]) {
        self.class_mapping = match &model {
            ModelSelection::External { classes, .. } => ClassMapping::default_for(classes, project_classes),
            _ => ClassMapping::default(),
        };
        self.model = model;
    }

    /// Build the backend request for one image.
    pub fn request(&self, image_id: ImageId) -> PredictionCall {
        let confidence = self.confidence.clamp(0.0, 1.0);
        match &self.model {
            ModelSelection::External { path, .. } => PredictionCall::External(ExternalModelRequest {
                model_path: path.clone(),
                image_id,
                confidence,
                class_mapping: self.class_mapping.as_map().clone(),
            }),
            ModelSelection::Trained { model_path, .. } => PredictionCall::Predict(PredictRequest {
                image_id,
                confidence,
                model_path: Some(model_path.clone()),
            }),
            ModelSelection::Custom { file_path, .. } => PredictionCall::Predict(PredictRequest {
                image_id,
                confidence,
                model_path: Some(file_path.clone()),
            }),
            ModelSelection::LatestTrained => PredictionCall::Predict(PredictRequest {
                image_id,
                confidence,
                model_path: None,
            }),
        }
    }

    /// Error text shown when a manual run fails.
    pub fn failure_message(&self) -> &'static str {
        if self.model.is_external() {
            "External model failed!"
        } else {
            "Label Assist failed. Train a model first!"
        }
    }
}

/// A prediction request routed to the right endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionCall {
    /// `POST /api/projects/{id}/predict`
    Predict(PredictRequest),
    /// `POST /api/projects/{id}/use-external-model`
    External(ExternalModelRequest),
}

/// Label-assist UI mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssistMode {
    #[default]
    Disabled,
    ConfigPanelOpen,
    /// Runs after every image load.
    EnabledPersistent,
}

/// Label-assist mode plus the configuration it runs with.
#[derive(Debug, Clone, Default)]
pub struct LabelAssist {
    pub mode: AssistMode,
    pub config: AssistConfig,
}

impl LabelAssist {
    /// The assist button: turns persistent mode off, otherwise opens or
    /// closes the configuration panel. Returns the new mode.
    pub fn toggle(&mut self) -> AssistMode {
        self.mode = match self.mode {
            AssistMode::EnabledPersistent | AssistMode::ConfigPanelOpen => AssistMode::Disabled,
            AssistMode::Disabled => AssistMode::ConfigPanelOpen,
        };
        self.mode
    }

    /// Close the panel without changing persistent mode.
    pub fn close_panel(&mut self) {
        if self.mode == AssistMode::ConfigPanelOpen {
            self.mode = AssistMode::Disabled;
        }
    }

    pub fn enable_persistent(&mut self) {
        self.config.persist_across_images = true;
        self.mode = AssistMode::EnabledPersistent;
    }

    /// Turn persistent mode off after an automatic run failed.
    pub fn disable_silently(&mut self) {
        self.config.persist_across_images = false;
        self.mode = AssistMode::Disabled;
    }

    pub fn is_persistent(&self) -> bool {
        self.mode == AssistMode::EnabledPersistent
    }
}

// ============================================================================
// Merging
// ============================================================================

/// Append predictions to the store as one undoable step.
///
/// With `clear_existing` the store is emptied first, in the same step.
/// Predictions whose class is not a project class are skipped. Returns the
/// number of boxes added.
pub fn merge_predictions(state: &mut EditorState, predictions: &[Prediction], clear_existing: bool) -> usize {
    let accepted: Vec<&Prediction> = predictions
        .iter()
        .filter(|p| {
            let known = state.class(p.class_id).is_some();
            if !known {
                log::debug!("Skipping prediction with unmapped class {}", p.class_id);
            }
            known
        })
        .collect();

    if clear_existing {
        state.selected = None;
    }
    let added = accepted.len();
    state.apply_mutation(|store| {
        if clear_existing {
            store.clear();
        }
        for prediction in accepted {
            let id = store.allocate_id();
            store.add(Annotation::predicted(id, prediction));
        }
    });
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::LoadedImage;
    use crate::geometry::BoxGeometry;
    use boxlab_api::ExternalModel;

    fn project_classes() -> Vec<LabelClass> {
        vec![
            LabelClass::new(11, "person", "#f00"),
            LabelClass::new(12, "bike", "#0f0"),
        ]
    }

    fn model_classes() -> Vec<ModelClass> {
        (0..3)
            .map(|id| ModelClass {
                id,
                name: format!("c{}", id),
            })
            .collect()
    }

    fn prediction(class_id: ClassId, confidence: f64) -> Prediction {
        Prediction {
            class_id,
            x_center: 0.5,
            y_center: 0.5,
            width: 0.2,
            height: 0.2,
            confidence,
        }
    }

    fn state_with_box() -> EditorState {
        let mut state = EditorState::default();
        state.set_classes(project_classes());
        state.load(
            LoadedImage::placeholder(1, "a.png", 100, 100),
            vec![Annotation::manual(1, 11, BoxGeometry::new(0.2, 0.2, 0.1, 0.1))],
        );
        state
    }

    #[test]
    fn test_default_class_mapping() {
        let mapping = ClassMapping::default_for(&model_classes(), &project_classes());
        assert_eq!(mapping.get(0), Some(11));
        assert_eq!(mapping.get(1), Some(12));
        assert_eq!(mapping.get(2), None);
    }

    #[test]
    fn test_mapping_set_and_skip() {
        let mut mapping = ClassMapping::default_for(&model_classes(), &project_classes());
        mapping.set(0, Some(12));
        mapping.set(1, None);
        assert_eq!(mapping.get(0), Some(12));
        assert_eq!(mapping.get(1), None);
    }

    #[test]
    fn test_request_routing() {
        let mut config = AssistConfig::default();
        assert_eq!(
            config.request(4),
            PredictionCall::Predict(PredictRequest {
                image_id: 4,
                confidence: 0.5,
                model_path: None,
            })
        );

        config.model = ModelSelection::Custom {
            model_id: 2,
            name: "mine".to_string(),
            file_path: "/models/mine.pt".to_string(),
        };
        let PredictionCall::Predict(request) = config.request(4) else {
            panic!("custom models use predict");
        };
        assert_eq!(request.model_path.as_deref(), Some("/models/mine.pt"));

        config.select_model(
            ModelSelection::External {
                name: "coco/yolo".to_string(),
                path: "/ext/yolo.pt".to_string(),
                classes: model_classes(),
            },
            &project_classes(),
        );
        let PredictionCall::External(request) = config.request(4) else {
            panic!("external models use the external endpoint");
        };
        assert_eq!(request.model_path, "/ext/yolo.pt");
        assert_eq!(request.class_mapping.get(&1), Some(&12));
        assert_eq!(config.failure_message(), "External model failed!");
    }

    #[test]
    fn test_failure_message_for_trained() {
        let config = AssistConfig::default();
        assert_eq!(config.failure_message(), "Label Assist failed. Train a model first!");
    }

    #[test]
    fn test_toggle_modes() {
        let mut assist = LabelAssist::default();
        assert_eq!(assist.toggle(), AssistMode::ConfigPanelOpen);
        assert_eq!(assist.toggle(), AssistMode::Disabled);

        assist.enable_persistent();
        assert!(assist.is_persistent());
        assist.close_panel();
        assert!(assist.is_persistent(), "closing the panel keeps persistent mode");
        assert_eq!(assist.toggle(), AssistMode::Disabled);
    }

    #[test]
    fn test_merge_appends_in_one_step() {
        let mut state = state_with_box();
        let added = merge_predictions(&mut state, &[prediction(11, 0.9), prediction(12, 0.7)], false);
        assert_eq!(added, 2);
        assert_eq!(state.store.len(), 3);
        let last = &state.store.list()[2];
        assert!(last.is_predicted);
        assert_eq!(last.confidence, 0.7);
        assert_eq!(state.history.undo_count(), 1);

        state.undo();
        assert_eq!(state.store.len(), 1);
    }

    #[test]
    fn test_merge_clear_existing_and_skip_unknown() {
        let mut state = state_with_box();
        state.select(1);
        let added = merge_predictions(&mut state, &[prediction(11, 0.9), prediction(99, 0.9)], true);
        assert_eq!(added, 1);
        assert_eq!(state.store.len(), 1);
        assert!(state.store.list().iter().all(|a| a.is_predicted));
        assert_eq!(state.selected, None);
        assert_eq!(state.history.undo_count(), 1);
    }

    #[test]
    fn test_catalogue_selections() {
        let project = ProjectDetails {
            id: 1,
            name: "p".to_string(),
            training_jobs: vec![
                TrainingJob {
                    id: 3,
                    name: "run-a".to_string(),
                    model_size: Some("s".to_string()),
                    status: "completed".to_string(),
                    model_path: Some("/runs/a.pt".to_string()),
                },
                TrainingJob {
                    id: 4,
                    name: "run-b".to_string(),
                    model_size: None,
                    status: "running".to_string(),
                    model_path: None,
                },
            ],
            custom_models: vec![CustomModel {
                id: 7,
                name: "uploaded".to_string(),
                file_path: "/up/u.pt".to_string(),
            }],
        };
        let external = vec![ExternalModelDir {
            model_dir: "coco".to_string(),
            models: vec![ExternalModel {
                name: "yolo.pt".to_string(),
                path: "/ext/coco/yolo.pt".to_string(),
                classes: model_classes(),
            }],
        }];
        let catalogue = ModelCatalogue::new(Some(project), external);
        let keys: Vec<String> = catalogue.selections().iter().map(ModelSelection::key).collect();
        assert_eq!(
            keys,
            vec!["latest", "trained:3", "custom:7", "external:/ext/coco/yolo.pt"]
        );
        let Some(ModelSelection::Trained { name, .. }) = catalogue.find("trained:3") else {
            panic!("trained model resolves");
        };
        assert_eq!(name, "run-a (Small)");
        assert!(catalogue.find("trained:4").is_none());
    }
}
