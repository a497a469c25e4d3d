pub use minijinja::{Environment, Value};
pub use minijinja_contrib;
pub use minijinja_embed;
use std::sync::Arc;

pub trait ProvidesTemplateEngine {
    fn template_engine(&self) -> &Arc<TemplateEngine>;
}

/// Rendering environment built from the calling crate's embedded templates.
#[derive(Clone)]
pub struct TemplateEngine {
    env: Arc<Environment<'static>>,
}

/// Build a [`TemplateEngine`] from templates embedded at compile time.
///
/// Must be invoked from the crate whose `build.rs` ran
/// `minijinja_embed::embed_templates!`, since the embedded bundle is keyed to
/// that crate.
#[macro_export]
macro_rules! create_template_engine {
    () => {{
        let mut env = $crate::utils::template_engine::Environment::new();
        $crate::utils::template_engine::minijinja_embed::load_templates!(&mut env);
        // Add contrib filters/functions
        $crate::utils::template_engine::minijinja_contrib::add_to_environment(&mut env);
        $crate::utils::template_engine::TemplateEngine::from_environment(env)
    }};
}

impl TemplateEngine {
    pub fn from_environment(env: Environment<'static>) -> Self {
        Self { env: Arc::new(env) }
    }

    pub fn render(&self, name: &str, ctx: &Value) -> Result<String, minijinja::Error> {
        self.env.get_template(name)?.render(ctx)
    }

    pub fn render_block(
        &self,
        template_name: &str,
        block_name: &str,
        context: &Value,
    ) -> Result<String, minijinja::Error> {
        self.env
            .get_template(template_name)?
            .eval_to_state(context)?
            .render_block(block_name)
    }
}
