use crate::board::{Board, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    pub const ALL: [Team; 2] = [Team::Red, Team::Blue];

    pub fn opponent(&self) -> Team {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
        }
    }

    /// Slot of this team in per-team arrays
    pub fn index(&self) -> usize {
        match self {
            Team::Red => 0,
            Team::Blue => 1,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Team::Red => "Red",
            Team::Blue => "Blue",
        }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Non-owning handle to an agent: its team plus its roster slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId {
    pub team: Team,
    pub slot: usize,
}

impl AgentId {
    pub fn new(team: Team, slot: usize) -> Self {
        AgentId { team, slot }
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.team, self.slot)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub team: Team,
    pub home_base: NodeId,
    pub position: NodeId,
    pub carrying_enemy_flag: bool,
}

impl Agent {
    pub fn new(team: Team, start: NodeId, home_base: NodeId) -> Self {
        Agent {
            team,
            home_base,
            position: start,
            carrying_enemy_flag: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flag {
    pub team: Team,
    pub home_base: NodeId,
    pub position: NodeId,
    pub carrier: Option<AgentId>,
}

impl Flag {
    pub fn new(team: Team, home_base: NodeId) -> Self {
        Flag {
            team,
            home_base,
            position: home_base,
            carrier: None,
        }
    }

    /// Return the flag to its base
    pub fn reset(&mut self) {
        self.position = self.home_base;
        self.carrier = None;
    }

    /// Hand the flag to `agent`. The agent's own possession bit is kept by
    /// the game state.
    pub fn pick_up(&mut self, agent: AgentId) {
        self.carrier = Some(agent);
    }

    pub fn is_carried(&self) -> bool {
        self.carrier.is_some()
    }
}

/// A committed decision: move `agent` one step to `to`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    pub agent: AgentId,
    pub to: NodeId,
}

impl Move {
    pub fn new(agent: AgentId, to: NodeId) -> Self {
        Move { agent, to }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.agent, self.to)
    }
}

#[derive(Debug, Error)]
pub enum GameError {
    #[error("No path from node {from} to node {to}")]
    NoPath { from: NodeId, to: NodeId },
    #[error("Unknown board node: {0}")]
    UnknownNode(NodeId),
    #[error("Invalid team state: {0}")]
    InvalidTeamState(String),
    #[error("Invalid move: {0}")]
    InvalidMove(String),
    #[error("Invalid setup: {0}")]
    InvalidSetup(String),
    #[error("Game already over")]
    GameOver,
    #[error("Not your turn")]
    NotYourTurn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    rosters: [Vec<Agent>; 2],
    flags: [Flag; 2],
    bases: [NodeId; 2],
    turn_owner: Team,
    winner: Option<Team>,
    turn_count: usize,
}

impl GameState {
    /// Create a game with each team's agents at the given start nodes and
    /// each flag resting on its team's base. Red moves first.
    pub fn new(
        board: &dyn Board,
        red_starts: &[NodeId],
        blue_starts: &[NodeId],
        red_base: NodeId,
        blue_base: NodeId,
    ) -> Result<Self, GameError> {
        if red_base == blue_base {
            return Err(GameError::InvalidSetup(format!(
                "both teams share base node {}",
                red_base
            )));
        }

        let mut rosters: [Vec<Agent>; 2] = [Vec::new(), Vec::new()];
        for (team, starts, base) in [
            (Team::Red, red_starts, red_base),
            (Team::Blue, blue_starts, blue_base),
        ] {
            if !board.contains(base) {
                return Err(GameError::UnknownNode(base));
            }
            if starts.is_empty() {
                return Err(GameError::InvalidSetup(format!("{} roster is empty", team)));
            }
            for &start in starts {
                if !board.contains(start) {
                    return Err(GameError::UnknownNode(start));
                }
                rosters[team.index()].push(Agent::new(team, start, base));
            }
        }

        Ok(GameState {
            rosters,
            flags: [Flag::new(Team::Red, red_base), Flag::new(Team::Blue, blue_base)],
            bases: [red_base, blue_base],
            turn_owner: Team::Red,
            winner: None,
            turn_count: 0,
        })
    }

    pub fn turn_owner(&self) -> Team {
        self.turn_owner
    }

    pub fn winner(&self) -> Option<Team> {
        self.winner
    }

    pub fn is_game_over(&self) -> bool {
        self.winner.is_some()
    }

    pub fn turn_count(&self) -> usize {
        self.turn_count
    }

    pub fn roster(&self, team: Team) -> &[Agent] {
        &self.rosters[team.index()]
    }

    /// Handles for every agent on `team`, in roster order
    pub fn agent_ids(&self, team: Team) -> impl Iterator<Item = AgentId> + '_ {
        (0..self.rosters[team.index()].len()).map(move |slot| AgentId::new(team, slot))
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.rosters[id.team.index()].get(id.slot)
    }

    fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.rosters[id.team.index()].get_mut(id.slot)
    }

    pub fn flag(&self, team: Team) -> &Flag {
        &self.flags[team.index()]
    }

    pub fn base(&self, team: Team) -> NodeId {
        self.bases[team.index()]
    }

    /// Resolve a flag's carrier handle, failing if it dangles
    pub fn carrier_of(&self, team: Team) -> Result<Option<&Agent>, GameError> {
        match self.flag(team).carrier {
            None => Ok(None),
            Some(id) => self.agent(id).map(Some).ok_or_else(|| {
                GameError::InvalidTeamState(format!("{} flag carrier {} does not exist", team, id))
            }),
        }
    }

    /// Either base node is a safe zone
    pub fn is_safe(&self, agent: &Agent) -> bool {
        self.bases.contains(&agent.position)
    }

    /// A flag is captured once its carrier stands on the carrier's own base
    pub fn is_captured(&self, team: Team) -> Result<bool, GameError> {
        Ok(self
            .carrier_of(team)?
            .is_some_and(|carrier| carrier.position == carrier.home_base))
    }

    /// Apply one turn: move, interception, pickup, possession sync, win check
    /// and turn hand-over. Returns the winner if this move ended the game.
    pub fn apply_move(&mut self, mv: Move, board: &dyn Board) -> Result<Option<Team>, GameError> {
        if self.is_game_over() {
            return Err(GameError::GameOver);
        }
        if mv.agent.team != self.turn_owner {
            return Err(GameError::NotYourTurn);
        }
        let from = self
            .agent(mv.agent)
            .ok_or_else(|| GameError::InvalidMove(format!("no agent {}", mv.agent)))?
            .position;
        if !board.is_adjacent(from, mv.to) {
            return Err(GameError::InvalidMove(format!(
                "{} cannot reach {} from {}",
                mv.agent, mv.to, from
            )));
        }

        let team = mv.agent.team;
        let enemy = team.opponent();

        if let Some(agent) = self.agent_mut(mv.agent) {
            agent.position = mv.to;
        }

        self.intercept(team, mv.to)?;

        let enemy_flag = &mut self.flags[enemy.index()];
        if !enemy_flag.is_carried() && enemy_flag.position == mv.to {
            enemy_flag.pick_up(mv.agent);
            if let Some(agent) = self.agent_mut(mv.agent) {
                agent.carrying_enemy_flag = true;
            }
            debug!(agent = %mv.agent, node = %mv.to, "picked up {} flag", enemy);
        }

        self.sync_flags()?;
        let winner = self.check_win()?;

        self.turn_count += 1;
        self.switch_turn();

        Ok(winner)
    }

    /// Strip `team`'s flag from an enemy carrier standing on `node`, unless
    /// that carrier is in a safe zone
    fn intercept(&mut self, team: Team, node: NodeId) -> Result<(), GameError> {
        let enemy = team.opponent();
        let Some(carrier_id) = self.flag(team).carrier else {
            return Ok(());
        };

        let caught = self.agent_ids(enemy).find(|&id| {
            id == carrier_id
                && self
                    .agent(id)
                    .is_some_and(|agent| agent.position == node && !self.is_safe(agent))
        });

        if let Some(id) = caught {
            self.flags[team.index()].reset();
            let agent = self.agent_mut(id).ok_or_else(|| {
                GameError::InvalidTeamState(format!("intercepted carrier {} vanished", id))
            })?;
            agent.carrying_enemy_flag = false;
            debug!(carrier = %id, node = %node, "{} flag intercepted and returned", team);
        }

        Ok(())
    }

    /// Carried flags follow their carriers
    fn sync_flags(&mut self) -> Result<(), GameError> {
        for team in Team::ALL {
            if let Some(position) = self.carrier_of(team)?.map(|carrier| carrier.position) {
                self.flags[team.index()].position = position;
            }
        }
        Ok(())
    }

    /// Set the winner if either flag has been captured
    pub fn check_win(&mut self) -> Result<Option<Team>, GameError> {
        let red_taken = self.is_captured(Team::Red)?;
        let blue_taken = self.is_captured(Team::Blue)?;

        let winner = match (red_taken, blue_taken) {
            (true, true) => {
                return Err(GameError::InvalidTeamState(
                    "both flags captured at once".to_string(),
                ));
            }
            (true, false) => Some(Team::Blue),
            (false, true) => Some(Team::Red),
            (false, false) => None,
        };

        if let Some(team) = winner {
            self.winner = Some(team);
            debug!(turn = self.turn_count, "{} captured the {} flag", team, team.opponent());
        }

        Ok(winner)
    }

    pub fn switch_turn(&mut self) {
        self.turn_owner = self.turn_owner.opponent();
    }

    /// Cross-check flag carriage against agent possession bits
    pub fn check_invariants(&self) -> Result<(), GameError> {
        for team in Team::ALL {
            let flag = self.flag(team);
            if let Some(id) = flag.carrier {
                if id.team != team.opponent() {
                    return Err(GameError::InvalidTeamState(format!(
                        "{} flag carried by teammate {}",
                        team, id
                    )));
                }
                let carrier = self.carrier_of(team)?.ok_or_else(|| {
                    GameError::InvalidTeamState(format!("{} flag carrier missing", team))
                })?;
                if !carrier.carrying_enemy_flag {
                    return Err(GameError::InvalidTeamState(format!(
                        "{} carries the {} flag but is not marked as carrying",
                        id, team
                    )));
                }
                if flag.position != carrier.position {
                    return Err(GameError::InvalidTeamState(format!(
                        "{} flag at {} but carrier {} at {}",
                        team, flag.position, id, carrier.position
                    )));
                }
            }

            for id in self.agent_ids(team) {
                let marked = self.agent(id).is_some_and(|agent| agent.carrying_enemy_flag);
                if marked && self.flag(team.opponent()).carrier != Some(id) {
                    return Err(GameError::InvalidTeamState(format!(
                        "{} marked as carrying but the {} flag disagrees",
                        id,
                        team.opponent()
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        let teams = Team::ALL.map(|team| TeamView {
            team,
            base: self.base(team),
            agents: self.roster(team).iter().map(|a| a.position).collect(),
            carrier: self.flag(team.opponent()).carrier.map(|id| id.slot),
            flag_position: self.flag(team).position,
        });

        Snapshot {
            turn: self.turn_count,
            turn_owner: self.turn_owner,
            winner: self.winner,
            teams,
        }
    }

    /// One-line text rendering of positions and possession
    pub fn display_state(&self) -> String {
        self.snapshot().to_string()
    }
}

#[cfg(test)]
impl GameState {
    pub(crate) fn place(&mut self, id: AgentId, node: NodeId) {
        self.rosters[id.team.index()][id.slot].position = node;
        let _ = self.sync_flags();
    }

    pub(crate) fn give_flag(&mut self, id: AgentId) {
        let flag = &mut self.flags[id.team.opponent().index()];
        flag.pick_up(id);
        self.rosters[id.team.index()][id.slot].carrying_enemy_flag = true;
        let _ = self.sync_flags();
    }

    pub(crate) fn set_turn(&mut self, team: Team) {
        self.turn_owner = team;
    }
}

/// Read-only view of the game handed to renderers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub turn: usize,
    pub turn_owner: Team,
    pub winner: Option<Team>,
    pub teams: [TeamView; 2],
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "turn {:>3} [{} to move]", self.turn, self.turn_owner)?;
        for view in &self.teams {
            let agents: Vec<String> = view
                .agents
                .iter()
                .enumerate()
                .map(|(slot, node)| {
                    if view.carrier == Some(slot) {
                        format!("{}*", node)
                    } else {
                        node.to_string()
                    }
                })
                .collect();
            write!(
                f,
                " | {} agents [{}] flag@{}",
                view.team,
                agents.join(","),
                view.flag_position
            )?;
        }
        if let Some(winner) = self.winner {
            write!(f, " | winner {}", winner)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamView {
    pub team: Team,
    pub base: NodeId,
    pub agents: Vec<NodeId>,
    /// Roster slot of the teammate holding the enemy flag
    pub carrier: Option<usize>,
    pub flag_position: NodeId,
}
