//! Decoded inbound request.
//!
//! A [`Request`] is what the host hands to the dispatcher once a platform
//! message has been decoded: the message [`Stack`], the conversation's
//! [`TransitionRegister`], and the locale plus collaborators needed to resolve
//! candidate strings.
//!
//! Ranking only takes `&Request`, so all triggers of a cycle can look at the
//! same request at once. The trigram of the inbound text is computed lazily and
//! at most once per request, however many triggers compare against it.

use crate::error::TriggerError;
use crate::intents::{IntentsDb, PlainRenderer, Renderer};
use crate::layers::{Layer, LayerKind, Stack};
use crate::register::TransitionRegister;
use crate::trigram::Trigram;
use once_cell::sync::OnceCell;
use std::fmt;
use std::sync::Arc;

pub struct Request {
    stack: Stack,
    register: TransitionRegister,
    locale: Option<String>,
    intents: Arc<IntentsDb>,
    renderer: Arc<dyn Renderer>,
    /// Trigram of the raw text as typed.
    text_trigram: OnceCell<Option<Trigram>>,
    /// Trigram of the raw text after rendering.
    rendered_trigram: OnceCell<Option<Trigram>>,
}

impl Request {
    pub fn new(stack: Stack, register: TransitionRegister) -> Self {
        Request {
            stack,
            register,
            locale: None,
            intents: Arc::new(IntentsDb::default()),
            renderer: Arc::new(PlainRenderer),
            text_trigram: OnceCell::new(),
            rendered_trigram: OnceCell::new(),
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }

    pub fn with_intents(mut self, intents: Arc<IntentsDb>) -> Self {
        self.intents = intents;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self.rendered_trigram = OnceCell::new();
        self
    }

    pub fn stack(&self) -> &Stack {
        &self.stack
    }

    pub fn register(&self) -> &TransitionRegister {
        &self.register
    }

    /// Mutable access to the register. Only patches and the host use this.
    pub fn register_mut(&mut self) -> &mut TransitionRegister {
        &mut self.register
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    pub fn intents(&self) -> &IntentsDb {
        &self.intents
    }

    pub fn renderer(&self) -> &dyn Renderer {
        self.renderer.as_ref()
    }

    pub fn has_layer(&self, kind: LayerKind) -> bool {
        self.stack.has_layer(kind)
    }

    pub fn get_layer(&self, kind: LayerKind) -> Option<&Layer> {
        self.stack.get_layer(kind)
    }

    /// Trigram of the first raw text layer, if there is one.
    pub fn text_trigram(&self) -> Option<&Trigram> {
        self.text_trigram.get_or_init(|| self.stack.raw_text().map(Trigram::new)).as_ref()
    }

    /// Trigram of the first raw text layer once passed through the renderer.
    pub fn rendered_text_trigram(&self) -> Result<Option<&Trigram>, TriggerError> {
        let cached = self.rendered_trigram.get_or_try_init(|| {
            self.stack
                .raw_text()
                .map(|text| self.renderer.render(text, self.locale()).map(|r| Trigram::new(&r)))
                .transpose()
        })?;
        Ok(cached.as_ref())
    }

    /// Hand the register back to the host once the cycle is over.
    pub fn into_register(self) -> TransitionRegister {
        self.register
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("stack", &self.stack)
            .field("register", &self.register)
            .field("locale", &self.locale)
            .field("renderer", &"<renderer>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Shouting;

    impl Renderer for Shouting {
        fn render(&self, text: &str, _locale: Option<&str>) -> Result<String, TriggerError> {
            Ok(format!("{}!!", text.to_uppercase()))
        }
    }

    struct Broken;

    impl Renderer for Broken {
        fn render(&self, _text: &str, _locale: Option<&str>) -> Result<String, TriggerError> {
            Err(TriggerError::Render("no translations loaded".into()))
        }
    }

    #[test]
    fn text_trigram_is_cached() {
        let req = Request::new(Stack::new(vec![Layer::raw_text("Hello")]), TransitionRegister::new());
        let a = req.text_trigram().unwrap() as *const Trigram;
        let b = req.text_trigram().unwrap() as *const Trigram;
        assert_eq!(a, b);
        assert_eq!(req.text_trigram().unwrap().normalized(), "hello");
    }

    #[test]
    fn no_raw_text_means_no_trigram() {
        let req = Request::new(Stack::new(vec![Layer::quick_reply("yes")]), TransitionRegister::new());
        assert!(req.text_trigram().is_none());
        assert!(req.rendered_text_trigram().unwrap().is_none());
    }

    #[test]
    fn rendered_trigram_goes_through_renderer() {
        let req = Request::new(Stack::new(vec![Layer::raw_text("hey")]), TransitionRegister::new())
            .with_renderer(Arc::new(Shouting));
        assert_eq!(req.rendered_text_trigram().unwrap().unwrap().normalized(), "hey");

        let broken = Request::new(Stack::new(vec![Layer::raw_text("hey")]), TransitionRegister::new())
            .with_renderer(Arc::new(Broken));
        assert!(matches!(broken.rendered_text_trigram(), Err(TriggerError::Render(_))));
    }
}
