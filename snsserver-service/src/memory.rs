use snsserver_common::{
    model::{
        Id,
        member::{Member, Username},
        post::{NewPost, Post, PostMarker},
    },
    store::{
        LikeCounter, MemberDirectory, PostStore, PostTransaction, StoreError, StoreResult,
    },
};
use std::{
    collections::{BTreeMap, HashMap},
    io,
    sync::{Arc, Mutex},
};

#[derive(Debug, Default)]
struct State {
    members: Vec<Member>,
    posts: BTreeMap<Id<PostMarker>, Post>,
    likes: HashMap<Id<PostMarker>, u64>,
    last_post_id: i64,
    fail_writes: bool,
}

/// Store double that applies transaction writes only on commit.
#[derive(Debug, Default, Clone)]
pub(crate) struct MemoryStore {
    state: Arc<Mutex<State>>,
}

#[derive(Debug)]
enum Write {
    Upsert(Post),
    Delete(Id<PostMarker>),
}

#[derive(Debug)]
pub(crate) struct MemoryTransaction {
    state: Arc<Mutex<State>>,
    writes: Vec<Write>,
}

impl MemoryStore {
    pub(crate) fn with_members(usernames: &[&str]) -> Self {
        let store = Self::default();
        store.state.lock().unwrap().members = usernames
            .iter()
            .zip(1..)
            .map(|(username, id)| Member {
                id: Id::new(id),
                username: Username::new((*username).to_owned()).unwrap(),
            })
            .collect();
        store
    }

    pub(crate) fn post(&self, post_id: Id<PostMarker>) -> Option<Post> {
        self.state.lock().unwrap().posts.get(&post_id).cloned()
    }

    pub(crate) fn post_count(&self) -> usize {
        self.state.lock().unwrap().posts.len()
    }

    pub(crate) fn like(&self, post_id: Id<PostMarker>) {
        *self.state.lock().unwrap().likes.entry(post_id).or_default() += 1;
    }

    pub(crate) fn comment(&self, post_id: Id<PostMarker>) {
        if let Some(post) = self.state.lock().unwrap().posts.get_mut(&post_id) {
            post.comment_count += 1;
        }
    }

    pub(crate) fn fail_writes(&self) {
        self.state.lock().unwrap().fail_writes = true;
    }
}

fn write_error() -> StoreError {
    StoreError::new(io::Error::other("writes are disabled"))
}

impl MemberDirectory for MemoryStore {
    async fn fetch_member_by_username(
        &self,
        username: &Username,
    ) -> StoreResult<Option<Member>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .members
            .iter()
            .find(|member| &member.username == username)
            .cloned())
    }
}

impl LikeCounter for MemoryStore {
    async fn count_likes(&self, post_id: Id<PostMarker>) -> StoreResult<u64> {
        let state = self.state.lock().unwrap();
        Ok(state.likes.get(&post_id).copied().unwrap_or_default())
    }
}

impl PostStore for MemoryStore {
    type Transaction = MemoryTransaction;

    async fn fetch_post(&self, post_id: Id<PostMarker>) -> StoreResult<Option<Post>> {
        Ok(self.post(post_id))
    }

    async fn fetch_all_posts(&self) -> StoreResult<Vec<Post>> {
        Ok(self.state.lock().unwrap().posts.values().cloned().collect())
    }

    async fn begin(&self) -> StoreResult<MemoryTransaction> {
        Ok(MemoryTransaction {
            state: Arc::clone(&self.state),
            writes: Vec::new(),
        })
    }
}

impl PostTransaction for MemoryTransaction {
    async fn fetch_post(&mut self, post_id: Id<PostMarker>) -> StoreResult<Option<Post>> {
        let pending = self.writes.iter().rev().find_map(|write| match write {
            Write::Upsert(post) if post.id == post_id => Some(Some(post.clone())),
            Write::Delete(id) if *id == post_id => Some(None),
            _ => None,
        });

        match pending {
            Some(post) => Ok(post),
            None => Ok(self.state.lock().unwrap().posts.get(&post_id).cloned()),
        }
    }

    async fn insert_post(&mut self, post: &NewPost) -> StoreResult<Post> {
        let id = {
            let mut state = self.state.lock().unwrap();
            if state.fail_writes {
                return Err(write_error());
            }
            state.last_post_id += 1;
            Id::new(state.last_post_id)
        };

        let post = Post {
            id,
            author: post.author.clone(),
            title: post.title.clone(),
            content: post.content.clone(),
            file_path: post.file_path.clone(),
            created_at: post.created_at,
            comment_count: 0,
        };
        self.writes.push(Write::Upsert(post.clone()));
        Ok(post)
    }

    async fn update_post(&mut self, post: &Post) -> StoreResult<()> {
        if self.state.lock().unwrap().fail_writes {
            return Err(write_error());
        }
        self.writes.push(Write::Upsert(post.clone()));
        Ok(())
    }

    async fn delete_post(&mut self, post_id: Id<PostMarker>) -> StoreResult<()> {
        if self.state.lock().unwrap().fail_writes {
            return Err(write_error());
        }
        self.writes.push(Write::Delete(post_id));
        Ok(())
    }

    async fn commit(self) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        for write in self.writes {
            match write {
                Write::Upsert(post) => {
                    state.posts.insert(post.id, post);
                }
                Write::Delete(post_id) => {
                    state.posts.remove(&post_id);
                    state.likes.remove(&post_id);
                }
            }
        }
        Ok(())
    }
}
