use crate::board::{Board, NodeId};
use crate::game::{Agent, GameError, GameState};

/// Attack or defend, as decided by [`choose_posture`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Posture {
    Attack,
    Defend,
}

/// Target node driven purely by who holds which flag.
///
/// A carrier heads home. While a teammate holds the enemy flag the agent
/// chases its own stolen flag, or guards its base if that flag is safe.
/// Otherwise everyone goes for the enemy flag.
pub fn pursuit_target(agent: &Agent, state: &GameState) -> NodeId {
    let own_flag = state.flag(agent.team);
    let enemy_flag = state.flag(agent.team.opponent());

    if agent.carrying_enemy_flag {
        agent.home_base
    } else if enemy_flag.is_carried() {
        if own_flag.is_carried() {
            own_flag.position
        } else {
            agent.home_base
        }
    } else {
        enemy_flag.position
    }
}

/// Whole path from the agent's position to `target`.
///
/// Index 1 is the proposed next step; a single-node path means the agent has
/// nowhere better to be. The same shape is returned by every move heuristic.
pub fn shortest_path_move(
    agent: &Agent,
    target: NodeId,
    board: &dyn Board,
) -> Result<Vec<NodeId>, GameError> {
    board.shortest_path(agent.position, target)
}

/// Chase down whoever is carrying this agent's flag.
///
/// Adjacent carriers are jumped on directly. Otherwise the agent heads for the
/// midpoint of the carrier's route home, or straight at the carrier once it is
/// already standing on that midpoint. With nobody carrying the flag this falls
/// back to the pursuit target.
pub fn defensive_move(
    agent: &Agent,
    state: &GameState,
    board: &dyn Board,
) -> Result<Vec<NodeId>, GameError> {
    let Some(carrier) = state.carrier_of(agent.team)? else {
        return shortest_path_move(agent, pursuit_target(agent, state), board);
    };

    if board.is_adjacent(agent.position, carrier.position) {
        return Ok(vec![agent.position, carrier.position]);
    }

    let escape = board.shortest_path(carrier.position, carrier.home_base)?;
    let waypoint = escape[escape.len() / 2];

    if waypoint == agent.position {
        board.shortest_path(agent.position, carrier.position)
    } else {
        board.shortest_path(agent.position, waypoint)
    }
}

/// Distance of the quickest opponent to its own objective: home if it holds
/// a flag, else this team's flag. `None` for an empty opposing roster.
pub fn fastest_threat(
    agent: &Agent,
    state: &GameState,
    board: &dyn Board,
) -> Result<Option<usize>, GameError> {
    let own_flag = state.flag(agent.team);
    let mut best: Option<usize> = None;

    for opponent in state.roster(agent.team.opponent()) {
        let target = if opponent.carrying_enemy_flag {
            opponent.home_base
        } else {
            own_flag.position
        };
        let distance = board.distance(opponent.position, target)?;
        best = Some(best.map_or(distance, |b| b.min(distance)));
    }

    Ok(best)
}

/// Attack when this agent is at least as close to its target as the fastest
/// opponent is to theirs. Ties go to attack.
pub fn choose_posture(
    agent: &Agent,
    state: &GameState,
    board: &dyn Board,
) -> Result<Posture, GameError> {
    let target = pursuit_target(agent, state);
    let own = board.distance(agent.position, target)?;

    Ok(match fastest_threat(agent, state, board)? {
        Some(threat) if own > threat => Posture::Defend,
        _ => Posture::Attack,
    })
}

pub fn balanced_move(
    agent: &Agent,
    state: &GameState,
    board: &dyn Board,
) -> Result<Vec<NodeId>, GameError> {
    match choose_posture(agent, state, board)? {
        Posture::Attack => shortest_path_move(agent, pursuit_target(agent, state), board),
        Posture::Defend => defensive_move(agent, state, board),
    }
}
