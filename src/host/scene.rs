//! Scene-node table: parent links, local transforms, tag properties and
//! bounding sizes for every object the sandbox creates.

use std::collections::{BTreeMap, HashMap};

use nalgebra::{Isometry3, Vector3};
use rapier3d::prelude::RigidBodyHandle;
use serde_json::Value;

use crate::engine::ObjectId;

#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub parent: Option<ObjectId>,
    pub local: Isometry3<f32>,          // parent-relative, or world when unparented
    pub props: HashMap<String, Value>,
    pub dims: Vector3<f32>,             // unscaled bounding size
    pub scale: Vector3<f32>,
    pub body: Option<RigidBodyHandle>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, parent: Option<ObjectId>, local: Isometry3<f32>, dims: Vector3<f32>) -> Self {
        Self {
            name: name.into(),
            parent,
            local,
            props: HashMap::new(),
            dims,
            scale: Vector3::repeat(1.0),
            body: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    nodes: BTreeMap<ObjectId, SceneNode>,
    by_body: HashMap<RigidBodyHandle, ObjectId>,
    next_id: u32,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: SceneNode) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        if let Some(body) = node.body {
            self.by_body.insert(body, id);
        }
        self.nodes.insert(id, node);
        id
    }

    pub fn bind_body(&mut self, object: ObjectId, body: RigidBodyHandle) {
        if let Some(node) = self.nodes.get_mut(&object) {
            node.body = Some(body);
            self.by_body.insert(body, object);
        }
    }

    pub fn get(&self, object: ObjectId) -> Option<&SceneNode> {
        self.nodes.get(&object)
    }

    pub fn get_mut(&mut self, object: ObjectId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(&object)
    }

    pub fn body_of(&self, object: ObjectId) -> Option<RigidBodyHandle> {
        self.nodes.get(&object).and_then(|n| n.body)
    }

    pub fn object_of(&self, body: RigidBodyHandle) -> Option<ObjectId> {
        self.by_body.get(&body).copied()
    }

    pub fn children(&self, object: ObjectId) -> Vec<ObjectId> {
        self.nodes
            .iter()
            .filter(|(_, n)| n.parent == Some(object))
            .map(|(id, _)| *id)
            .collect()
    }

    /// True if `ancestor` is `object` or one of its parents.
    pub fn is_ancestor(&self, ancestor: ObjectId, object: ObjectId) -> bool {
        let mut cursor = Some(object);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes.get(&current).and_then(|n| n.parent);
        }
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &SceneNode)> + '_ {
        self.nodes.iter().map(|(id, n)| (*id, n))
    }
}
