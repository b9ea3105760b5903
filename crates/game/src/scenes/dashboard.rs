use datarun_engine::{Contact, ContactSide, GameContext, SceneId, SceneLifecycle, SpawnKind};
use tracing::debug;

use super::kit::SceneKit;

const PLOTS: [&str; 3] = ["plot1", "plot2", "plot3"];

/// Dashboard: plots appear one by one while the player stands on the panel.
pub(crate) struct DashboardScene {
    kit: SceneKit,
}

impl DashboardScene {
    pub(crate) fn new() -> Self {
        Self {
            kit: SceneKit::new(10),
        }
    }
}

impl SceneLifecycle for DashboardScene {
    fn id(&self) -> SceneId {
        self.kit.id()
    }

    fn custom_events(&self) -> &'static [&'static str] {
        &["plots1", "plots2", "plots3", "reset"]
    }

    fn preload(&mut self, ctx: &mut GameContext) {
        self.kit.spawn_level_objects(ctx);
        for plot in PLOTS {
            self.kit.set_visible_with_prefix(ctx, plot, false);
        }
    }

    fn on_checkpoint(&mut self, _stage: u8, ctx: &mut GameContext) {
        self.kit.enter_checkpoint(ctx);
    }

    fn on_clear(&mut self, ctx: &mut GameContext) {
        self.kit.despawn_all(ctx);
        ctx.player.on_dashboard = false;
    }

    fn on_custom(&mut self, event: &'static str, ctx: &mut GameContext) {
        match event {
            "reset" => ctx.player.on_dashboard = false,
            plots => {
                let Some(index) = plots.strip_prefix("plots") else {
                    return;
                };
                let shown = self
                    .kit
                    .set_visible_with_prefix(ctx, &format!("plot{index}"), true);
                debug!(plots = index, shown, "dashboard_plots_shown");
            }
        }
    }

    fn on_contact(&mut self, contact: &Contact, ctx: &mut GameContext) {
        match contact.kind {
            Some(SpawnKind::Dashboard) => {
                if contact.side == ContactSide::Down {
                    ctx.player.on_dashboard = true;
                }
                ctx.land_player();
            }
            _ => ctx.land_on_ground(),
        }
    }
}

#[cfg(test)]
mod tests {
    use datarun_engine::EngineCommand;

    use super::*;
    use crate::scenes::kit::test_support::{context_with, descriptor};

    fn loaded() -> (DashboardScene, GameContext) {
        let mut ctx = context_with(vec![
            descriptor(10, "dashboard", 24_000.0, SpawnKind::Dashboard),
            descriptor(10, "plot1-bars", 24_100.0, SpawnKind::Image),
            descriptor(10, "plot2-pie", 24_200.0, SpawnKind::Image),
            descriptor(10, "plot2-line", 24_300.0, SpawnKind::Image),
        ]);
        let mut scene = DashboardScene::new();
        scene.preload(&mut ctx);
        ctx.drain_commands();
        (scene, ctx)
    }

    fn visible(ctx: &GameContext) -> usize {
        ctx.pending_commands()
            .iter()
            .filter(|command| {
                matches!(command, EngineCommand::SetObjectVisible { visible: true, .. })
            })
            .count()
    }

    #[test]
    fn plots_appear_by_group() {
        let (mut scene, mut ctx) = loaded();

        scene.on_custom("plots2", &mut ctx);
        assert_eq!(visible(&ctx), 2);

        scene.on_custom("plots1", &mut ctx);
        assert_eq!(visible(&ctx), 3);
    }

    #[test]
    fn standing_on_the_panel_blocks_jumping_until_reset() {
        let (mut scene, mut ctx) = loaded();
        let panel = Contact {
            object: None,
            owner: Some(SceneId(10)),
            kind: Some(SpawnKind::Dashboard),
            side: ContactSide::Down,
        };

        scene.on_contact(&panel, &mut ctx);
        assert!(ctx.player.on_dashboard);

        scene.on_custom("reset", &mut ctx);
        assert!(!ctx.player.on_dashboard);
    }

    #[test]
    fn plain_ground_does_not_mark_the_panel() {
        let (mut scene, mut ctx) = loaded();

        scene.on_contact(&Contact::foreground(), &mut ctx);

        assert!(!ctx.player.on_dashboard);
    }
}
