//! Per-frame update of the player and every live entity.

use glam::Vec2;
use stagewalker_core::{
    AbilityKind, BoxShape, DestroyReason, Direction, EntityId, Event, Groups, HitBox,
};
use stagewalker_system_combat::{DamageSource, Effect, EffectTick, Hit, SLASH_FRAMES};
use stagewalker_system_lifecycle::{bequeath, DeathCountdown, Vitals};
use stagewalker_system_movement::{push_direction, resolve_step, translate};

use crate::entity::{ArrowGun, Enemy, Entity, EntityKind, Spike};
use crate::{World, WorldError};

impl World {
    /// Advances the simulation by one frame.
    pub(crate) fn tick(&mut self, out_events: &mut Vec<Event>) -> Result<(), WorldError> {
        self.frame += 1;
        out_events.push(Event::TimeAdvanced { frame: self.frame });

        self.update_player(out_events)?;

        // Entities spawned during the frame wait in `spawned` until the end.
        let count = self.entities.len();
        for index in 0..count {
            let Some(mut entity) = self.entities.get_mut(index).and_then(Option::take) else {
                continue;
            };

            match self.update_entity(&mut entity, out_events) {
                Ok(true) => self.restore(index, entity),
                Ok(false) => {}
                Err(error) => {
                    self.restore(index, entity);
                    return Err(error);
                }
            }
        }

        self.resolve_deaths(out_events);
        self.entities.retain(Option::is_some);
        self.entities.extend(self.spawned.drain(..).map(Some));
        self.check_screen_bounds(out_events);
        Ok(())
    }

    /// Activates the ability of the player or of an ability-bearing entity.
    pub(crate) fn activate_ability(
        &mut self,
        id: EntityId,
        direction: Vec2,
        out_events: &mut Vec<Event>,
    ) {
        if id == self.player.id {
            self.activate_player(direction, out_events);
            return;
        }

        let Some(index) = self
            .entities
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|entity| entity.id == id))
        else {
            tracing::trace!(entity = %id, "activation ignored for unknown entity");
            return;
        };
        let Some(mut entity) = self.entities.get_mut(index).and_then(Option::take) else {
            return;
        };

        let (frame, origin) = (entity.frame_counter, entity.position);
        if let Some(ability) = entity.ability_mut() {
            if let Some(spawn) = ability.activate(id, frame, origin, direction, &mut self.rng) {
                let source = self.spawn_source(spawn, out_events);
                ability.track(source);
            }
        } else {
            tracing::trace!(entity = %id, "activation ignored for entity without ability");
        }

        self.restore(index, entity);
    }

    fn restore(&mut self, index: usize, entity: Entity) {
        if let Some(slot) = self.entities.get_mut(index) {
            *slot = Some(entity);
        }
    }

    fn update_player(&mut self, out_events: &mut Vec<Event>) -> Result<(), WorldError> {
        if let Some(death) = self.player.death.as_mut() {
            if death.tick() {
                tracing::info!(frame = self.frame, "game over requested");
                out_events.push(Event::GameOverRequested);
            }
            return Ok(());
        }

        self.player.frame_counter += 1;
        let mut direction = self.player.direction;
        let mut speed = self.player.speed;
        let before = self.player.vitals.health();
        if let Some(tick) = self.player.vitals.tick_affliction(self.player.frame_counter) {
            report_damage(out_events, self.player.id, tick.source, before, &self.player.vitals);
            (direction, speed) = afflicted_motion(direction, speed, &tick.effect);
        }

        if self.player.slash > 0 {
            self.player.slash -= 1;
            self.player.velocity = Vec2::ZERO;
        } else {
            let position = self.player.position;
            let shape = self.player.shape;
            self.push_blocks(position, direction.normalize_or_zero() * speed, speed, &shape, out_events);
            let outcome = resolve_step(position, direction, speed, &shape, |candidate| {
                self.blocked(candidate)
            })?;
            self.player.position = outcome.position;
            self.player.velocity = outcome.velocity;
        }

        if self.player.ability_active {
            let aim = self.player.aim - self.player.position;
            self.activate_player(aim, out_events);
        }

        Ok(())
    }

    fn activate_player(&mut self, direction: Vec2, out_events: &mut Vec<Event>) {
        if self.player.is_dead() {
            return;
        }

        let Some(spawn) = self.player.ability.activate(
            self.player.id,
            self.player.frame_counter,
            self.player.position,
            direction,
            &mut self.rng,
        ) else {
            return;
        };

        if spawn.source.ability() == AbilityKind::Melee {
            self.player.slash = SLASH_FRAMES;
        }
        let source = self.spawn_source(spawn, out_events);
        self.player.ability.track(source);
    }

    /// Starts a translation for every idle block a mover with `shape` walks into.
    ///
    /// A pushed block keeps obstructing while it moves, so the mover stops flush
    /// against it this frame and follows it on the next ones.
    fn push_blocks(
        &mut self,
        position: Vec2,
        velocity: Vec2,
        speed: f32,
        shape: &BoxShape,
        out_events: &mut Vec<Event>,
    ) {
        let frames = (self.grid.tile_size() / self.config.block_speed).round().max(0.0) as u64;

        for entity in self.entities.iter_mut().flatten() {
            let hit_box = entity.hit_box();
            let EntityKind::Block(block) = &mut entity.kind else {
                continue;
            };
            if block.is_moving() {
                continue;
            }

            if let Some(direction) = push_direction(position, velocity, speed, shape, &hit_box) {
                block.heading = Some(direction);
                block.remaining = frames;
                tracing::debug!(block = %entity.id, ?direction, "block pushed");
                out_events.push(Event::BlockPushed {
                    block: entity.id,
                    direction,
                });
            }
        }
    }

    fn update_entity(&mut self, entity: &mut Entity, out_events: &mut Vec<Event>) -> Result<bool, WorldError> {
        let frame = entity.frame_counter;
        entity.frame_counter += 1;
        let hit_box = entity.hit_box();
        let Entity {
            id,
            groups,
            position,
            velocity,
            shape,
            frame_counter,
            kind,
        } = entity;

        match kind {
            EntityKind::Wall | EntityKind::Ornament => {}
            EntityKind::Door(door) => {
                door.timer = door.timer.saturating_sub(1);
                *groups = if door.open { Groups::empty() } else { Groups::WALLS };
            }
            EntityKind::Block(block) => {
                *velocity = match block.heading {
                    Some(heading) if block.is_moving() => heading.unit() * self.config.block_speed,
                    _ => Vec2::ZERO,
                };
                if block.is_moving() {
                    block.remaining -= 1;
                    if block.remaining == 0 {
                        block.heading = None;
                    }
                    let player_box = self.player.hit_box();
                    *position = translate(*position, *velocity, shape, |candidate| {
                        self.blocked(candidate)
                            || candidate.intersects(&player_box)
                            || self.occupied_by_enemy(candidate)
                    })?;
                }
            }
            EntityKind::Enemy(enemy) => {
                self.update_enemy(*id, *frame_counter, position, velocity, enemy, out_events)?;
            }
            EntityKind::Source(source) => {
                return Ok(self.update_source(*id, position, *velocity, source, out_events));
            }
            EntityKind::Spike(spike) => self.update_spike(*id, frame, &hit_box, spike, out_events),
            EntityKind::ArrowGun(gun) => {
                self.update_arrow_gun(*id, *frame_counter, *position, gun, out_events);
            }
        }

        Ok(true)
    }

    fn update_enemy(
        &mut self,
        id: EntityId,
        frame: u64,
        position: &mut Vec2,
        velocity: &mut Vec2,
        enemy: &mut Enemy,
        out_events: &mut Vec<Event>,
    ) -> Result<(), WorldError> {
        let viewport = self.grid.viewport();
        let range_squared = enemy.range * enemy.range;
        let distance_squared = self.player.position.distance_squared(*position);

        let inside = position.x > 0.0 && position.y > 0.0 && position.x < viewport.x && position.y < viewport.y;
        let player_tile = Vec2::new(
            self.player.position.x.rem_euclid(viewport.x),
            self.player.position.y.rem_euclid(viewport.y),
        );
        match (inside, self.grid.tile_of(*position), self.grid.tile_of(player_tile)) {
            (true, Some(source), Some(target)) => {
                let (grid, stage) = (&self.grid, self.stage);
                let size = grid.stage_size();
                let _ = enemy.pathfinder.find_path(size.columns(), size.rows(), source, target, |tile| {
                    grid.is_wall(stage, tile, true)
                });
            }
            _ => enemy.pathfinder.clear(),
        }

        if distance_squared > range_squared {
            if let Some(step) = enemy.pathfinder.first_step() {
                enemy.direction = (self.grid.tile_center(step) - *position).normalize_or_zero();
            }
        }

        let mut direction = enemy.direction;
        let mut speed = enemy.speed;
        let before = enemy.vitals.health();
        if let Some(tick) = enemy.vitals.tick_affliction(frame) {
            report_damage(out_events, id, tick.source, before, &enemy.vitals);
            (direction, speed) = afflicted_motion(direction, speed, &tick.effect);
        }

        self.push_blocks(
            *position,
            direction.normalize_or_zero() * speed,
            speed,
            &enemy.wall_shape,
            out_events,
        );
        let outcome = resolve_step(*position, direction, speed, &enemy.wall_shape, |candidate| {
            self.blocked(candidate)
        })?;
        *position = outcome.position;
        *velocity = outcome.velocity;
        enemy.direction = Vec2::ZERO;

        if !self.player.is_dead() && distance_squared < range_squared {
            let aim = self.player.position - *position;
            if let Some(spawn) = enemy.ability.activate(id, frame, *position, aim, &mut self.rng) {
                let source = self.spawn_source(spawn, out_events);
                enemy.ability.track(source);
            }
        }

        Ok(())
    }

    /// Moves a source, applies its contacts, and reports whether it survives the frame.
    fn update_source(
        &mut self,
        id: EntityId,
        position: &mut Vec2,
        velocity: Vec2,
        source: &mut DamageSource,
        out_events: &mut Vec<Event>,
    ) -> bool {
        let owner = source.owner();
        if source.follows_owner() {
            let Some(anchor) = self.position_of(owner) else {
                self.destroy_source(id, owner, DestroyReason::Expired, out_events);
                return false;
            };
            *position = anchor;
        } else {
            *position += velocity;
        }

        let expired = source.age();
        let hit = source.hit(id);
        let mut destroyed = false;

        if !self.player.is_dead() && source.touches(*position, self.player.position, &self.player.hit_box()) {
            let contact = source.contact(Groups::PLAYER);
            if contact.afflicts {
                let before = self.player.vitals.health();
                if self.player.vitals.on_damage(self.player.frame_counter, &hit).is_some() {
                    report_damage(out_events, self.player.id, id, before, &self.player.vitals);
                }
            }
            destroyed |= contact.destroys;
        }

        for other in self.entities.iter_mut().flatten() {
            if other.groups.is_empty() || !source.touches(*position, other.position, &other.hit_box()) {
                continue;
            }

            let contact = source.contact(other.groups);
            let (target, frame) = (other.id, other.frame_counter);
            if contact.afflicts {
                if let Some(vitals) = other.vitals_mut() {
                    let before = vitals.health();
                    if vitals.on_damage(frame, &hit).is_some() {
                        report_damage(out_events, target, id, before, vitals);
                    }
                }
            }
            destroyed |= contact.destroys;
        }

        let viewport = self.grid.viewport();
        let outside = position.x <= 0.0 || position.y <= 0.0 || position.x >= viewport.x || position.y >= viewport.y;
        let reason = if destroyed {
            Some(DestroyReason::KillList)
        } else if expired {
            Some(DestroyReason::Expired)
        } else if outside {
            Some(DestroyReason::OutOfBounds)
        } else {
            None
        };

        match reason {
            Some(reason) => {
                self.destroy_source(id, owner, reason, out_events);
                false
            }
            None => true,
        }
    }

    fn destroy_source(&mut self, id: EntityId, owner: EntityId, reason: DestroyReason, out_events: &mut Vec<Event>) {
        tracing::trace!(source = %id, %owner, ?reason, "damage source destroyed");
        self.release_source(owner, id);
        out_events.push(Event::DamageSourceDestroyed { source: id, reason });
    }

    fn update_spike(&mut self, id: EntityId, frame: u64, area: &HitBox, spike: &mut Spike, out_events: &mut Vec<Event>) {
        let tuning = &self.config.spike;
        spike.rearm = spike.rearm.saturating_sub(1);
        if tuning.cycle > 0 && frame % tuning.cycle == 0 {
            spike.up = !spike.up;
        }
        if !spike.up || spike.rearm > 0 {
            return;
        }

        let hit = Hit {
            source: id,
            damage: tuning.damage,
            duration: tuning.rearm,
            effect: Effect::Flash,
        };
        let rearm = tuning.rearm;

        if !self.player.is_dead() && self.player.hit_box().intersects(area) {
            let before = self.player.vitals.health();
            if self.player.vitals.on_damage(self.player.frame_counter, &hit).is_some() {
                report_damage(out_events, self.player.id, id, before, &self.player.vitals);
                spike.rearm = rearm;
                return;
            }
        }

        for other in self.entities.iter_mut().flatten() {
            if !other.groups.contains(Groups::ENEMIES) || !other.hit_box().intersects(area) {
                continue;
            }

            let (target, frame) = (other.id, other.frame_counter);
            if let Some(vitals) = other.vitals_mut() {
                let before = vitals.health();
                if vitals.on_damage(frame, &hit).is_some() {
                    report_damage(out_events, target, id, before, vitals);
                    spike.rearm = rearm;
                    return;
                }
            }
        }
    }

    fn update_arrow_gun(
        &mut self,
        id: EntityId,
        frame: u64,
        position: Vec2,
        gun: &mut ArrowGun,
        out_events: &mut Vec<Event>,
    ) {
        if gun.firing_delay == 0 || frame % gun.firing_delay != 0 {
            return;
        }

        let direction = if gun.aiming {
            match self.nearest_target(position, gun.ability.damage_list()) {
                Some(target) => target - position,
                None => return,
            }
        } else {
            gun.heading.unit()
        };

        if let Some(spawn) = gun.ability.activate(id, frame, position, direction, &mut self.rng) {
            let source = self.spawn_source(spawn, out_events);
            gun.ability.track(source);
        }
    }

    /// Position of the closest living target belonging to `groups`.
    fn nearest_target(&self, origin: Vec2, groups: Groups) -> Option<Vec2> {
        let player = (groups.contains(Groups::PLAYER) && !self.player.is_dead()).then_some(self.player.position);

        self.live_entities()
            .filter(|entity| entity.vitals().is_some() && entity.groups.intersects(groups))
            .map(|entity| entity.position)
            .chain(player)
            .min_by(|a, b| a.distance_squared(origin).total_cmp(&b.distance_squared(origin)))
    }

    fn position_of(&self, id: EntityId) -> Option<Vec2> {
        if id == self.player.id {
            return Some(self.player.position);
        }

        self.live_entities()
            .find(|entity| entity.id == id)
            .map(|entity| entity.position)
    }

    fn resolve_deaths(&mut self, out_events: &mut Vec<Event>) {
        for index in 0..self.entities.len() {
            let dead = self
                .entities
                .get(index)
                .and_then(Option::as_ref)
                .and_then(Entity::vitals)
                .is_some_and(Vitals::is_dead);
            if !dead {
                continue;
            }
            let Some(Entity { id, position, kind: EntityKind::Enemy(enemy), .. }) =
                self.entities.get_mut(index).and_then(Option::take)
            else {
                continue;
            };

            tracing::debug!(entity = %id, archetype = ?enemy.archetype, "enemy died");
            out_events.push(Event::EntityDied { entity: id });

            let tile_center = self
                .grid
                .tile_of(position)
                .map_or(position, |tile| self.grid.tile_center(tile));
            let bequest = bequeath(
                &enemy.ability,
                enemy.vitals.rooted(),
                tile_center,
                self.config.player.inheritance_heal,
            );

            if !self.player.is_dead() {
                let ability = bequest.ability.kind();
                self.player.ability = bequest.ability;
                let _ = self.player.vitals.add_health(bequest.heal);
                tracing::info!(%ability, from = %id, "player inherited ability");
                out_events.push(Event::AbilityInherited { from: id, ability });
            }

            if let Some(center) = bequest.block_at {
                self.leave_block(center);
            }
        }

        if !self.player.is_dead() && self.player.vitals.is_dead() {
            self.player.death = Some(DeathCountdown::start(self.config.player.death_countdown));
            self.player.velocity = Vec2::ZERO;
            self.player.ability_active = false;
            tracing::info!(frame = self.frame, "player died");
            out_events.push(Event::PlayerDied);
        }
    }

    /// Leaves a block where a rooted enemy died, unless something already stands there.
    fn leave_block(&mut self, center: Vec2) {
        let footprint = HitBox::from_center_size(center, Vec2::splat(self.grid.tile_size()));
        if self.blocked(&footprint)
            || footprint.intersects(&self.player.hit_box())
            || self.occupied_by_enemy(&footprint)
        {
            tracing::debug!(x = center.x, y = center.y, "rooted enemy left no block on occupied tile");
            return;
        }

        let block = self.block_entity(center);
        self.spawned.push(block);
    }

    fn check_screen_bounds(&mut self, out_events: &mut Vec<Event>) {
        if self.player.is_dead() {
            return;
        }

        let viewport = self.grid.viewport();
        let position = self.player.position;
        let bound = if position.x < 0.0 {
            Some(Direction::West)
        } else if position.x >= viewport.x {
            Some(Direction::East)
        } else if position.y < 0.0 {
            Some(Direction::North)
        } else if position.y >= viewport.y {
            Some(Direction::South)
        } else {
            None
        };

        if let Some(bound) = bound {
            tracing::debug!(?bound, "player crossed screen bound");
            out_events.push(Event::ScreenBoundCrossed { bound });
        }
    }
}

/// Direction and speed of an afflicted mover; a hook steers it but never speeds it up.
fn afflicted_motion(direction: Vec2, speed: f32, effect: &EffectTick) -> (Vec2, f32) {
    if effect.immobilize {
        return (Vec2::ZERO, speed);
    }

    match effect.pull {
        Some(pull) => (pull.normalize_or_zero(), speed),
        None => (direction, speed),
    }
}

fn report_damage(out_events: &mut Vec<Event>, entity: EntityId, source: EntityId, before: f32, vitals: &Vitals) {
    let amount = before - vitals.health();
    if amount > 0.0 {
        out_events.push(Event::EntityDamaged {
            entity,
            source,
            amount,
            health: vitals.health(),
        });
    }
}

#[cfg(test)]
mod tests {
    use stagewalker_system_combat::HOOK_PULL;

    use super::*;

    #[test]
    fn hooked_mover_heads_along_the_pull_at_its_own_speed() {
        let effect = EffectTick {
            pull: Some(Vec2::new(0.0, -HOOK_PULL)),
            ..EffectTick::default()
        };

        assert_eq!(afflicted_motion(Vec2::X, 3.0, &effect), (Vec2::new(0.0, -1.0), 3.0));
    }

    #[test]
    fn rooted_mover_stands_still() {
        let effect = EffectTick {
            immobilize: true,
            ..EffectTick::default()
        };

        assert_eq!(afflicted_motion(Vec2::X, 8.0, &effect).0, Vec2::ZERO);
    }

    #[test]
    fn unafflicted_motion_is_untouched() {
        let effect = EffectTick::default();

        assert_eq!(afflicted_motion(Vec2::Y, 8.0, &effect), (Vec2::Y, 8.0));
    }
}
