use datarun_engine::{
    Contact, ContactSide, GameContext, PickupItem, SceneId, SceneLifecycle, SpawnKind,
};
use tracing::info;

use super::kit::SceneKit;

/// Data factory: conveyors carry the player, presses crush, the brush polishes.
pub(crate) struct FactoryScene {
    kit: SceneKit,
}

impl FactoryScene {
    pub(crate) fn new() -> Self {
        Self {
            kit: SceneKit::new(4),
        }
    }
}

impl SceneLifecycle for FactoryScene {
    fn id(&self) -> SceneId {
        self.kit.id()
    }

    fn preload(&mut self, ctx: &mut GameContext) {
        self.kit.spawn_level_objects(ctx);
    }

    fn on_checkpoint(&mut self, _stage: u8, ctx: &mut GameContext) {
        self.kit.enter_checkpoint(ctx);
    }

    fn on_clear(&mut self, ctx: &mut GameContext) {
        self.kit.despawn_all(ctx);
    }

    fn on_contact(&mut self, contact: &Contact, ctx: &mut GameContext) {
        match contact.kind.as_ref() {
            Some(SpawnKind::Conveyor { speed }) => {
                ctx.land_player();
                if contact.side == ContactSide::Down {
                    ctx.player.velocity_base = *speed;
                }
            }
            Some(SpawnKind::Hazard) => ctx.trigger_game_over(),
            Some(SpawnKind::Pickup {
                item: PickupItem::Bling,
            }) => {
                if !ctx.player.blinged {
                    ctx.player.blinged = true;
                    ctx.audio.play_effect("clear-bling");
                    info!("player_blinged");
                }
            }
            _ => ctx.land_on_ground(),
        }
    }
}

#[cfg(test)]
mod tests {
    use datarun_engine::{AudioCommand, EngineCommand};

    use super::*;
    use crate::scenes::kit::test_support::context;

    fn contact(kind: SpawnKind, side: ContactSide) -> Contact {
        Contact {
            object: None,
            owner: Some(SceneId(4)),
            kind: Some(kind),
            side,
        }
    }

    #[test]
    fn conveyor_sets_base_velocity_and_ground_resets_it() {
        let mut scene = FactoryScene::new();
        let mut ctx = context();

        scene.on_contact(
            &contact(SpawnKind::Conveyor { speed: 180.0 }, ContactSide::Down),
            &mut ctx,
        );
        assert!((ctx.player.velocity_base - 180.0).abs() < 0.0001);

        scene.on_contact(&contact(SpawnKind::Ground, ContactSide::Down), &mut ctx);
        assert!(ctx.player.velocity_base.abs() < 0.0001);
    }

    #[test]
    fn presses_end_the_game_even_when_blinged() {
        let mut scene = FactoryScene::new();
        let mut ctx = context();
        ctx.player.blinged = true;

        scene.on_contact(&contact(SpawnKind::Hazard, ContactSide::Overlap), &mut ctx);

        assert!(ctx.is_game_over());
    }

    #[test]
    fn brush_blings_only_once() {
        let mut scene = FactoryScene::new();
        let mut ctx = context();
        let brush = contact(
            SpawnKind::Pickup {
                item: PickupItem::Bling,
            },
            ContactSide::Overlap,
        );

        scene.on_contact(&brush, &mut ctx);
        scene.on_contact(&brush, &mut ctx);

        assert!(ctx.player.blinged);
        let effects = ctx
            .audio
            .drain()
            .into_iter()
            .filter(|command| {
                matches!(command, AudioCommand::Play { key: "clear-bling", .. })
            })
            .count();
        assert_eq!(effects, 1);
        assert!(!ctx
            .pending_commands()
            .contains(&EngineCommand::PausePhysics));
    }
}
