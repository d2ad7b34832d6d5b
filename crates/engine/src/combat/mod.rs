mod occlusion;
mod resolver;
mod weapon;

pub use occlusion::SlopeRanges;
pub use resolver::{resolve_attack, AttackHit, AttackQuery, TargetFilter};
pub use weapon::{Inventory, MissileSpec, Weapon, WeaponId, WeaponKind, WeaponTable, WeaponVisuals};
