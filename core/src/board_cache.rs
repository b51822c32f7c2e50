use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::time::Duration;
use std::time::Instant;

use bbsweb_bbs::Bbs;
use bbsweb_bbs::Board;
use bbsweb_bbs::BoardRef;
use bbsweb_bbs::one_board;

const BRD_CACHE_EXPIRE: Duration = Duration::from_secs(5 * 60);

/// In-process board-by-name cache. Board descriptors are needed on nearly
/// every request and change rarely, so they are held ahead of the KV tier.
#[derive(Default)]
pub struct BoardCache {
    entries: Mutex<HashMap<String, (Board, Instant)>>,
}

impl BoardCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn board_by_name(
        &self,
        bbs: &dyn Bbs,
        brd_name: &str,
    ) -> bbsweb_bbs::Result<Board> {
        let key = brd_name.to_lowercase();
        if let Some(board) = self.get(&key) {
            return Ok(board);
        }

        let board = one_board(bbs.get_boards(&[BoardRef::by_name(brd_name)]).await?)?;
        self.set(key, board.clone());
        Ok(board)
    }

    fn get(&self, key: &str) -> Option<Board> {
        let mut entries = self.lock_entries();
        if let Some((board, expire)) = entries.get(key)
            && Instant::now() < *expire
        {
            return Some(board.clone());
        }
        entries.remove(key);
        None
    }

    fn set(&self, key: String, board: Board) {
        self.lock_entries()
            .insert(key, (board, Instant::now() + BRD_CACHE_EXPIRE));
    }

    fn lock_entries(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<String, (Board, Instant)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
