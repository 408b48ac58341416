//! Prompt template loading and rendering via `minijinja`.
//!
//! The built-in templates are compiled into the crate. When
//! `llm.templates_dir` is set, any `<name>.j2` file found there replaces the
//! built-in template of the same name, so operators can tune prompts without
//! recompiling. Every prompt pairs the shared `system` template with one
//! task template.

use std::path::Path;

use minijinja::{Environment, context};

use crate::error::RunnerError;

/// Built-in templates, by name.
const BUILTIN_TEMPLATES: [(&str, &str); 7] = [
    ("system", include_str!("../templates/system.j2")),
    ("fork", include_str!("../templates/fork.j2")),
    ("narration", include_str!("../templates/narration.j2")),
    ("voice", include_str!("../templates/voice.j2")),
    ("image", include_str!("../templates/image.j2")),
    ("video", include_str!("../templates/video.j2")),
    ("scenario", include_str!("../templates/scenario.j2")),
];

/// The task a prompt is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    /// Fork delta, ripples, and scores.
    Fork,
    /// Narration prose.
    Narration,
    /// Voice-command interpretation.
    Voice,
    /// Image-generator prompt.
    Image,
    /// Video-generator prompt.
    Video,
    /// Whole scenario seed.
    Scenario,
}

impl PromptKind {
    /// Name of the task template.
    pub const fn template_name(self) -> &'static str {
        match self {
            Self::Fork => "fork",
            Self::Narration => "narration",
            Self::Voice => "voice",
            Self::Image => "image",
            Self::Video => "video",
            Self::Scenario => "scenario",
        }
    }

    /// Whether the reply must be a JSON object.
    pub const fn expects_json(self) -> bool {
        matches!(self, Self::Fork | Self::Voice | Self::Scenario)
    }

    /// Completion budget for the reply.
    pub const fn max_tokens(self) -> u32 {
        match self {
            Self::Fork => 1500,
            Self::Scenario => 4000,
            Self::Narration => 300,
            Self::Voice | Self::Image | Self::Video => 200,
        }
    }
}

/// The complete rendered prompt ready to send to an LLM backend.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    /// System message.
    pub system: String,
    /// User message describing the task.
    pub user: String,
    /// Completion budget.
    pub max_tokens: u32,
    /// Whether to request a JSON object reply.
    pub expects_json: bool,
}

/// Manages prompt template loading and rendering.
#[derive(Debug)]
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    /// An engine over the built-in templates only.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Template`] if a built-in template fails to
    /// compile.
    pub fn builtin() -> Result<Self, RunnerError> {
        Self::load(None)
    }

    /// An engine over the built-in templates, replaced by any `<name>.j2`
    /// found in `overrides`.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Template`] if `overrides` is not a directory,
    /// an override cannot be read, or a template fails to compile.
    pub fn load(overrides: Option<&Path>) -> Result<Self, RunnerError> {
        if let Some(dir) = overrides
            && !dir.is_dir()
        {
            return Err(RunnerError::Template(format!(
                "templates directory {} does not exist",
                dir.display()
            )));
        }

        let mut env = Environment::new();
        for (name, builtin) in BUILTIN_TEMPLATES {
            let source = match overrides.map(|dir| dir.join(format!("{name}.j2"))) {
                Some(path) if path.is_file() => std::fs::read_to_string(&path).map_err(|e| {
                    RunnerError::Template(format!("failed to read {}: {e}", path.display()))
                })?,
                _ => builtin.to_owned(),
            };
            env.add_template_owned(name, source)
                .map_err(|e| RunnerError::Template(format!("failed to add {name} template: {e}")))?;
        }

        Ok(Self { env })
    }

    /// Render the system message and the task template for `kind` with the
    /// given context.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Template`] if rendering fails.
    pub fn render(
        &self,
        kind: PromptKind,
        task_context: &serde_json::Value,
    ) -> Result<RenderedPrompt, RunnerError> {
        let system = self
            .env
            .get_template("system")
            .map_err(|e| RunnerError::Template(format!("missing system template: {e}")))?
            .render(context! { json => kind.expects_json() })
            .map_err(|e| RunnerError::Template(format!("system render failed: {e}")))?;

        let name = kind.template_name();
        let user = self
            .env
            .get_template(name)
            .map_err(|e| RunnerError::Template(format!("missing {name} template: {e}")))?
            .render(task_context)
            .map_err(|e| RunnerError::Template(format!("{name} render failed: {e}")))?;

        Ok(RenderedPrompt {
            system: system.trim().to_owned(),
            user: user.trim().to_owned(),
            max_tokens: kind.max_tokens(),
            expects_json: kind.expects_json(),
        })
    }
}
