use crate::board::{Board, NodeId};
use crate::game::{Agent, AgentId, GameError, GameState, Move, Team};
use crate::heuristics::{balanced_move, pursuit_target};
use rand::RngCore;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::trace;

/// Trait that every team controller must implement
pub trait Bot: Send {
    /// Get the name of the bot
    fn name(&self) -> &str;

    /// Pick one agent of the team to move and where it steps
    fn select_move(
        &mut self,
        state: &GameState,
        board: &dyn Board,
        rng: &mut dyn RngCore,
    ) -> Result<Move, GameError>;

    /// Notified when the game starts
    fn game_start(&mut self, _team: Team) {}

    /// Notified when a move is made (by either team)
    fn notify_move(&mut self, _mv: Move) {}

    /// Notified when the game ends
    fn game_end(&mut self) {}
}

/// Multipliers applied on top of the progress score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    /// Landing on a teammate
    pub clustering: f64,
    /// Landing on or next to an opponent
    pub threat: f64,
    /// Extra factor when a flag carrier lands in the threat zone
    pub carrier_threat: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        ScoringWeights {
            clustering: 0.8,
            threat: 0.7,
            carrier_threat: 0.5,
        }
    }
}

/// A scored proposal for one agent
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub agent: AgentId,
    pub path: Vec<NodeId>,
    pub score: f64,
}

/// Nodes occupied by or adjacent to any agent of `team`
pub fn threat_set(state: &GameState, team: Team, board: &dyn Board) -> HashSet<NodeId> {
    let mut threats = HashSet::new();
    for enemy in state.roster(team) {
        threats.insert(enemy.position);
        threats.extend(board.neighbors(enemy.position).iter().copied());
    }
    threats
}

/// Score moving agent `id` to `destination`.
///
/// Starts from distance closed towards the pursuit target plus a small bonus
/// for being close in absolute terms, then applies the clustering, escort,
/// threat and carrier-threat adjustments in that order.
pub fn score_move(
    state: &GameState,
    board: &dyn Board,
    id: AgentId,
    destination: NodeId,
    threats: &HashSet<NodeId>,
    weights: &ScoringWeights,
) -> Result<f64, GameError> {
    let agent = state
        .agent(id)
        .ok_or_else(|| GameError::InvalidTeamState(format!("no agent {}", id)))?;
    let target = pursuit_target(agent, state);

    let old_distance = board.distance(agent.position, target)? as f64;
    let new_distance = board.distance(destination, target)? as f64;
    let mut score = (old_distance - new_distance) + 1.0 / (1.0 + new_distance);

    let crowded = state
        .agent_ids(id.team)
        .filter(|&other| other != id)
        .filter_map(|other| state.agent(other))
        .any(|mate| mate.position == destination);
    if crowded {
        score *= weights.clustering;
    }

    score += escort_bonus(state, board, id.team, destination)?;

    if threats.contains(&destination) {
        score *= weights.threat;
        if agent.carrying_enemy_flag {
            score *= weights.carrier_threat;
        }
    }

    Ok(score)
}

/// Pull towards our stolen flag, stronger the closer the thief is to home
fn escort_bonus(
    state: &GameState,
    board: &dyn Board,
    team: Team,
    destination: NodeId,
) -> Result<f64, GameError> {
    let flag = state.flag(team);
    if !flag.is_carried() {
        return Ok(0.0);
    }

    let enemy_base = state.base(team.opponent());
    let to_flag = board.distance(destination, flag.position)? as f64;
    let journey = board.distance(flag.home_base, enemy_base)? as f64;
    let remaining = board.distance(flag.position, enemy_base)? as f64;

    Ok((journey / remaining) / (1.0 + to_flag))
}

/// Best-scoring move across the turn owner's roster.
///
/// Agents with no forward step are not scored. Exact ties keep the agent that
/// comes first in roster order.
pub fn best_candidate(
    state: &GameState,
    board: &dyn Board,
    weights: &ScoringWeights,
) -> Result<Option<Candidate>, GameError> {
    let team = state.turn_owner();
    let threats = threat_set(state, team.opponent(), board);
    let mut best: Option<Candidate> = None;

    for (id, agent) in state.agent_ids(team).zip(state.roster(team)) {
        let path = balanced_move(agent, state, board)?;
        if path.len() <= 1 {
            continue;
        }

        let score = score_move(state, board, id, path[1], &threats, weights)?;
        trace!(agent = %id, to = %path[1], score, "scored candidate");

        if best.as_ref().is_none_or(|b| score > b.score) {
            best = Some(Candidate {
                agent: id,
                path,
                score,
            });
        }
    }

    Ok(best)
}

/// Uniformly random neighbour of `agent`'s position
pub fn random_step(
    agent: &Agent,
    board: &dyn Board,
    rng: &mut dyn RngCore,
) -> Result<NodeId, GameError> {
    board
        .neighbors(agent.position)
        .choose(rng)
        .copied()
        .ok_or_else(|| GameError::InvalidMove(format!("node {} has no neighbours", agent.position)))
}

fn random_agent(state: &GameState, rng: &mut dyn RngCore) -> Result<AgentId, GameError> {
    let team = state.turn_owner();
    let ids: Vec<AgentId> = state.agent_ids(team).collect();
    ids.choose(rng)
        .copied()
        .ok_or_else(|| GameError::InvalidTeamState(format!("{} roster is empty", team)))
}

/// Used when no agent has a scorable move: a random mover takes its own
/// heuristic step, or a random neighbour if it has none
pub fn fallback_move(
    state: &GameState,
    board: &dyn Board,
    rng: &mut dyn RngCore,
) -> Result<Move, GameError> {
    let id = random_agent(state, rng)?;
    let agent = state
        .agent(id)
        .ok_or_else(|| GameError::InvalidTeamState(format!("no agent {}", id)))?;

    let path = balanced_move(agent, state, board)?;
    let to = match path.get(1) {
        Some(&next) => next,
        None => random_step(agent, board, rng)?,
    };
    Ok(Move::new(id, to))
}

/// Scores every teammate's balanced move and commits the best one
pub struct HeuristicBot {
    name: String,
    weights: ScoringWeights,
}

impl HeuristicBot {
    pub fn new(name: String) -> Self {
        Self::with_weights(name, ScoringWeights::default())
    }

    pub fn with_weights(name: String, weights: ScoringWeights) -> Self {
        HeuristicBot { name, weights }
    }
}

impl Bot for HeuristicBot {
    fn name(&self) -> &str {
        &self.name
    }

    fn select_move(
        &mut self,
        state: &GameState,
        board: &dyn Board,
        rng: &mut dyn RngCore,
    ) -> Result<Move, GameError> {
        match best_candidate(state, board, &self.weights)? {
            Some(candidate) => Ok(Move::new(candidate.agent, candidate.path[1])),
            None => {
                trace!(team = %state.turn_owner(), "no scorable candidate, picking a random mover");
                fallback_move(state, board, rng)
            }
        }
    }
}

/// Baseline opponent: random mover, random step
pub struct RandomBot {
    name: String,
}

impl RandomBot {
    pub fn new(name: String) -> Self {
        RandomBot { name }
    }
}

impl Bot for RandomBot {
    fn name(&self) -> &str {
        &self.name
    }

    fn select_move(
        &mut self,
        state: &GameState,
        board: &dyn Board,
        rng: &mut dyn RngCore,
    ) -> Result<Move, GameError> {
        let id = random_agent(state, rng)?;
        let agent = state
            .agent(id)
            .ok_or_else(|| GameError::InvalidTeamState(format!("no agent {}", id)))?;
        Ok(Move::new(id, random_step(agent, board, rng)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::GraphBoard;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn nodes(ids: &[usize]) -> Vec<NodeId> {
        ids.iter().copied().map(NodeId).collect()
    }

    fn red(slot: usize) -> AgentId {
        AgentId::new(Team::Red, slot)
    }

    fn blue(slot: usize) -> AgentId {
        AgentId::new(Team::Blue, slot)
    }

    fn create_test_game() -> (GraphBoard, GameState) {
        let board = GraphBoard::grid(4, 3);
        let state = GameState::new(
            &board,
            &nodes(&[0, 1, 3]),
            &nodes(&[11, 8, 10]),
            NodeId(0),
            NodeId(11),
        )
        .unwrap();
        (board, state)
    }

    /// Red agent 0 alone in the middle, teammates parked at base, blue
    /// huddled in the bottom-left corner
    fn open_field() -> (GraphBoard, GameState) {
        let (board, mut state) = create_test_game();
        state.place(red(0), NodeId(4));
        state.place(red(1), NodeId(0));
        state.place(red(2), NodeId(0));
        for slot in 0..3 {
            state.place(blue(slot), NodeId(9));
        }
        (board, state)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_threat_set_covers_neighbourhood() {
        let (board, state) = open_field();
        let threats = threat_set(&state, Team::Blue, &board);
        assert_eq!(threats, HashSet::from([NodeId(9), NodeId(6), NodeId(10)]));
    }

    #[test]
    fn test_progress_score() {
        let (board, state) = open_field();
        let threats = threat_set(&state, Team::Blue, &board);
        let weights = ScoringWeights::default();

        // 4 -> 11 is four nodes, 5 -> 11 is three
        let score = score_move(&state, &board, red(0), NodeId(5), &threats, &weights).unwrap();
        assert!(approx(score, 1.0 + 1.0 / 4.0));
    }

    #[test]
    fn test_closer_destination_scores_higher() {
        let (board, state) = open_field();
        let threats = threat_set(&state, Team::Blue, &board);
        let weights = ScoringWeights::default();

        let closer = score_move(&state, &board, red(0), NodeId(5), &threats, &weights).unwrap();
        let farther = score_move(&state, &board, red(0), NodeId(3), &threats, &weights).unwrap();
        assert!(closer > farther);
    }

    #[test]
    fn test_clustering_penalty() {
        let (board, mut state) = open_field();
        let threats = threat_set(&state, Team::Blue, &board);
        let weights = ScoringWeights::default();

        let alone = score_move(&state, &board, red(0), NodeId(5), &threats, &weights).unwrap();
        state.place(red(1), NodeId(5));
        let stacked = score_move(&state, &board, red(0), NodeId(5), &threats, &weights).unwrap();
        assert!(approx(stacked, alone * 0.8));
    }

    #[test]
    fn test_threat_penalty_doubles_for_carrier() {
        let (board, mut state) = open_field();
        state.place(red(0), NodeId(3));
        let threats = threat_set(&state, Team::Blue, &board);
        let weights = ScoringWeights::default();

        // 6 is next to the blue huddle
        let plain = 1.0 / (1.0 + 4.0) + (5.0 - 4.0);
        let score = score_move(&state, &board, red(0), NodeId(6), &threats, &weights).unwrap();
        assert!(approx(score, plain * 0.7));

        state.give_flag(red(0));
        // Carrier heads for node 0: from 3 that is two nodes, from 6 three
        let carrying_plain = (2.0 - 3.0) + 1.0 / (1.0 + 3.0);
        let score = score_move(&state, &board, red(0), NodeId(6), &threats, &weights).unwrap();
        assert!(approx(score, carrying_plain * 0.7 * 0.5));
    }

    #[test]
    fn test_escort_bonus_when_flag_is_stolen() {
        let (board, mut state) = open_field();
        state.give_flag(blue(0));
        state.place(blue(0), NodeId(8));
        let threats = threat_set(&state, Team::Blue, &board);
        let weights = ScoringWeights::default();

        // The blue flag is still at rest, so red 1 keeps targeting node 11
        let score = score_move(&state, &board, red(1), NodeId(1), &threats, &weights).unwrap();

        let progress = (6.0 - 5.0) + 1.0 / (1.0 + 5.0);
        let ratio = 6.0 / 2.0;
        let to_flag = 4.0;
        let expected = progress + ratio / (1.0 + to_flag);
        assert!(approx(score, expected));
    }

    #[test]
    fn test_best_candidate_prefers_biggest_gain() {
        let (board, mut state) = open_field();
        state.place(red(1), NodeId(10));

        let best = best_candidate(&state, &board, &ScoringWeights::default())
            .unwrap()
            .unwrap();
        // red 1 is one step from the blue flag
        assert_eq!(best.agent, red(1));
        assert_eq!(best.path, nodes(&[10, 11]));
    }

    #[test]
    fn test_exact_tie_keeps_earlier_roster_slot() {
        // 3x3 grid: red 0 already sits on the blue flag, reds 1 and 2 are
        // mirror images one step away from it
        let board = GraphBoard::grid(3, 3);
        let mirrored = |first: usize, second: usize| {
            GameState::new(
                &board,
                &nodes(&[8, first, second]),
                &nodes(&[1]),
                NodeId(0),
                NodeId(8),
            )
            .unwrap()
        };
        let weights = ScoringWeights::default();

        let state = mirrored(5, 7);
        let settled = state.agent(red(0)).unwrap();
        assert_eq!(balanced_move(settled, &state, &board).unwrap(), nodes(&[8]));

        let best = best_candidate(&state, &board, &weights).unwrap().unwrap();
        assert_eq!(best.agent, red(1));
        assert_eq!(best.path, nodes(&[5, 8]));

        let swapped = mirrored(7, 5);
        let best = best_candidate(&swapped, &board, &weights).unwrap().unwrap();
        assert_eq!(best.agent, red(1));
        assert_eq!(best.path, nodes(&[7, 8]));

        let threats = threat_set(&state, Team::Blue, &board);
        let left = score_move(&state, &board, red(1), NodeId(8), &threats, &weights).unwrap();
        let right = score_move(&state, &board, red(2), NodeId(8), &threats, &weights).unwrap();
        assert_eq!(left, right);
    }

    #[test]
    fn test_heuristic_bot_moves_for_turn_owner() {
        let (board, state) = create_test_game();
        let mut rng = StdRng::seed_from_u64(7);
        let mut bot = HeuristicBot::new("heuristic".to_string());

        let mv = bot.select_move(&state, &board, &mut rng).unwrap();
        assert_eq!(mv.agent.team, Team::Red);
        let from = state.agent(mv.agent).unwrap().position;
        assert!(board.is_adjacent(from, mv.to));
    }

    #[test]
    fn test_fallback_when_no_agent_can_advance() {
        let (board, mut state) = create_test_game();
        // Every red agent is already standing on the resting blue flag
        for slot in 0..3 {
            state.place(red(slot), NodeId(11));
        }
        for slot in 0..3 {
            state.place(blue(slot), NodeId(0));
        }
        assert!(best_candidate(&state, &board, &ScoringWeights::default())
            .unwrap()
            .is_none());

        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut bot = HeuristicBot::new("heuristic".to_string());
            let mv = bot.select_move(&state, &board, &mut rng).unwrap();

            assert_eq!(mv.agent.team, Team::Red);
            assert!(mv.agent.slot < state.roster(Team::Red).len());
            assert!(board.is_adjacent(NodeId(11), mv.to));

            let mut next = state.clone();
            next.apply_move(mv, &board).unwrap();
        }
    }

    #[test]
    fn test_random_bot_stays_on_the_board() {
        let (board, mut state) = create_test_game();
        state.set_turn(Team::Blue);
        let mut rng = StdRng::seed_from_u64(42);
        let mut bot = RandomBot::new("random".to_string());

        for _ in 0..10 {
            let mv = bot.select_move(&state, &board, &mut rng).unwrap();
            assert_eq!(mv.agent.team, Team::Blue);
            let from = state.agent(mv.agent).unwrap().position;
            assert!(board.is_adjacent(from, mv.to));
        }
    }

    #[test]
    fn test_stranded_agent_reports_invalid_move() {
        let board = GraphBoard::new(2);
        let state =
            GameState::new(&board, &nodes(&[0]), &nodes(&[1]), NodeId(0), NodeId(1)).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let agent = state.agent(red(0)).unwrap();
        assert!(matches!(
            random_step(agent, &board, &mut rng),
            Err(GameError::InvalidMove(_))
        ));
    }
}
