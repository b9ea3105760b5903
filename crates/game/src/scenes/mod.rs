mod dashboard;
mod factory;
mod kit;
mod lake;
mod office;
mod pipeline;
mod snowflakes;
mod sources;
mod stage;

use datarun_engine::SceneLifecycle;

use self::dashboard::DashboardScene;
use self::factory::FactoryScene;
use self::lake::LakeScene;
use self::office::OfficeScene;
use self::pipeline::PipelineScene;
use self::snowflakes::SnowflakesScene;
use self::sources::SourcesScene;
use self::stage::{StageScene, BRICKS, CLOUDS, END_OFFICE, OIL, QUOTES};

/// Every level section, in level order.
pub(crate) fn all_scenes() -> Vec<Box<dyn SceneLifecycle>> {
    vec![
        Box::new(OfficeScene::new()),
        Box::new(SourcesScene::new()),
        Box::new(PipelineScene::new()),
        Box::new(FactoryScene::new()),
        Box::new(StageScene::new(CLOUDS)),
        Box::new(LakeScene::new()),
        Box::new(StageScene::new(OIL)),
        Box::new(StageScene::new(QUOTES)),
        Box::new(StageScene::new(BRICKS)),
        Box::new(DashboardScene::new()),
        Box::new(StageScene::new(END_OFFICE)),
        Box::new(SnowflakesScene::new()),
    ]
}
