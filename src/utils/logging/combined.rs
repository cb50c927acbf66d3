//! A layer fanning out to a runtime-sized list of sub-layers.
//!
//! The number of log outputs is only known after config has been read, and
//! `tracing-subscriber` layers are normally composed statically, so each output
//! is boxed and kept in a vec here.
use tracing_core::{
    callsite, span,
    subscriber::{Interest, Subscriber},
    Event, Metadata,
};
use tracing_subscriber::layer::{Context, Layer as LayerTrait};

type BoxedLayer<S> = Box<dyn LayerTrait<S> + Send + Sync + 'static>;

pub struct Layer<S> {
    inners: Vec<BoxedLayer<S>>,
}

impl<S> LayerTrait<S> for Layer<S>
where
    S: Subscriber,
{
    fn register_callsite(&self, metadata: &'static Metadata<'static>) -> Interest {
        let mut interest = Interest::always();
        for layer in &self.inners {
            // once a layer says never or sometimes, the answer can not get more permissive
            if !interest.is_always() {
                break;
            }
            interest = layer.register_callsite(metadata);
        }
        interest
    }

    fn enabled(&self, metadata: &Metadata<'_>, ctx: Context<'_, S>) -> bool {
        self.inners.iter().all(|layer| layer.enabled(metadata, ctx.clone()))
    }

    fn new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        self.inners
            .iter()
            .for_each(|layer| layer.new_span(attrs, id, ctx.clone()));
    }

    fn on_record(&self, span: &span::Id, values: &span::Record<'_>, ctx: Context<'_, S>) {
        self.inners
            .iter()
            .for_each(|layer| layer.on_record(span, values, ctx.clone()));
    }

    fn on_follows_from(&self, span: &span::Id, follows: &span::Id, ctx: Context<'_, S>) {
        self.inners
            .iter()
            .for_each(|layer| layer.on_follows_from(span, follows, ctx.clone()));
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        self.inners
            .iter()
            .for_each(|layer| layer.on_event(event, ctx.clone()));
    }

    fn on_enter(&self, id: &span::Id, ctx: Context<'_, S>) {
        self.inners
            .iter()
            .for_each(|layer| layer.on_enter(id, ctx.clone()));
    }

    fn on_exit(&self, id: &span::Id, ctx: Context<'_, S>) {
        self.inners
            .iter()
            .for_each(|layer| layer.on_exit(id, ctx.clone()));
    }

    fn on_close(&self, id: span::Id, ctx: Context<'_, S>) {
        self.inners
            .iter()
            .for_each(|layer| layer.on_close(id.clone(), ctx.clone()));
    }

    fn on_id_change(&self, old: &span::Id, new: &span::Id, ctx: Context<'_, S>) {
        self.inners
            .iter()
            .for_each(|layer| layer.on_id_change(old, new, ctx.clone()));
    }
}

impl<S> Layer<S>
where
    S: Subscriber,
{
    /// A layer with no outputs, which lets everything through and records nothing
    pub fn empty() -> Self {
        Self { inners: vec![] }
    }

    pub fn add<L>(&mut self, layer: L) -> &mut Self
    where
        L: LayerTrait<S> + Send + Sync + 'static,
    {
        self.inners.push(Box::new(layer));
        // cached interests were computed without this layer
        callsite::rebuild_interest_cache();
        self
    }
}
