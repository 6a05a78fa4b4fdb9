//! Defines the kinematic tree of a robot as an arena of links and joints.

use std::{collections::HashMap, fmt::Display};

use crate::{pose::Pose, registry::EntityCategory, Error};

use super::elements::{Joint, Link, MaterialDescription};

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tree_tests;

/// Defines the position of a [Link] in a [RobotDescription].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct LinkIndex(usize);

impl LinkIndex {
    /// Returns the position of the link in [RobotDescription::links].
    pub fn index(&self) -> usize {
        self.0
    }
}

impl Display for LinkIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LinkIndex [{}]", self.0)
    }
}

/// Defines the position of a [Joint] in a [RobotDescription].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct JointIndex(usize);

impl JointIndex {
    /// Returns the position of the joint in [RobotDescription::joints].
    pub fn index(&self) -> usize {
        self.0
    }
}

impl Display for JointIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JointIndex [{}]", self.0)
    }
}

/// Defines the kinematic tree of a robot.
///
/// Links and joints are stored in document order and addressed by index. The tree structure is
/// kept in separate tables: every link has at most one parent joint, and every link has a list
/// of child joints in document order. A [RobotDescription] is always a valid tree with a single
/// root link.
#[derive(Clone, Debug)]
pub struct RobotDescription {
    /// The name of the robot.
    name: String,

    /// The links in document order.
    links: Vec<Link>,

    /// The joints in document order.
    joints: Vec<Joint>,

    /// The materials declared by the document.
    materials: Vec<MaterialDescription>,

    /// The mapping from link name to link index.
    link_by_name: HashMap<String, LinkIndex>,

    /// The parent and child link of each joint, indexed by joint.
    joint_links: Vec<(LinkIndex, LinkIndex)>,

    /// The parent joint of each link, indexed by link.
    parent_of: Vec<Option<JointIndex>>,

    /// The child joints of each link in document order, indexed by link.
    children_of: Vec<Vec<JointIndex>>,

    /// The only link without a parent joint.
    root: LinkIndex,
}

impl RobotDescription {
    /// Returns the child joints of the link together with the link on the other side of each
    /// joint, in document order.
    pub fn children(&self, link: LinkIndex) -> impl Iterator<Item = (JointIndex, LinkIndex)> + '_ {
        self.children_of[link.0]
            .iter()
            .map(move |joint| (*joint, self.joint_links[joint.0].1))
    }

    /// Returns the pose of the link frame relative to the root link frame.
    ///
    /// The pose is the composition of the origins of all the joints between the root and the
    /// link. The root link has the identity pose.
    pub fn global_pose(&self, link: LinkIndex) -> Pose {
        let mut pose = Pose::identity();
        let mut current = link;
        while let Some(joint) = self.parent_of[current.0] {
            pose = self.joints[joint.0].origin.compose(&pose);
            current = self.joint_links[joint.0].0;
        }

        pose
    }

    /// Returns the joint at the given index.
    pub fn joint(&self, joint: JointIndex) -> &Joint {
        &self.joints[joint.0]
    }

    /// Returns the index of the joint with the given name.
    pub fn joint_by_name(&self, name: &str) -> Option<JointIndex> {
        self.joints
            .iter()
            .position(|j| j.name == name)
            .map(JointIndex)
    }

    /// Returns all joints in document order.
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    /// Returns the link at the given index.
    pub fn link(&self, link: LinkIndex) -> &Link {
        &self.links[link.0]
    }

    /// Returns the index of the link with the given name.
    pub fn link_by_name(&self, name: &str) -> Option<LinkIndex> {
        self.link_by_name.get(name).copied()
    }

    /// Returns all links in document order.
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Returns the materials declared by the document.
    pub fn materials(&self) -> &[MaterialDescription] {
        &self.materials
    }

    /// Returns the name of the robot.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Creates a new [RobotDescription] and validates that the links and joints form a tree.
    ///
    /// ## Parameters
    ///
    /// * 'name' - The name of the robot.
    /// * 'links' - The links in document order.
    /// * 'joints' - The joints in document order.
    /// * 'materials' - The materials declared by the document.
    ///
    /// ## Errors
    ///
    /// * [Error::DuplicateName] - Returned when two links, two joints or two materials share a
    ///   name.
    /// * [Error::UnknownLink] - Returned when a joint refers to a link that does not exist.
    /// * [Error::LinkHasMultipleParents] - Returned when a link is the child of more than one
    ///   joint.
    /// * [Error::MissingRootLink] - Returned when there are no links, or when every link has a
    ///   parent joint.
    /// * [Error::MultipleRootLinks] - Returned when more than one link has no parent joint.
    /// * [Error::CyclicKinematicTree] - Returned when some links cannot be reached from the
    ///   root link.
    pub fn new<S: Into<String>>(
        name: S,
        links: Vec<Link>,
        joints: Vec<Joint>,
        materials: Vec<MaterialDescription>,
    ) -> Result<Self, Error> {
        let mut link_by_name = HashMap::with_capacity(links.len());
        for (index, link) in links.iter().enumerate() {
            if link_by_name
                .insert(link.name.clone(), LinkIndex(index))
                .is_some()
            {
                return Err(Error::DuplicateName {
                    category: EntityCategory::Node,
                    name: link.name.clone(),
                });
            }
        }

        check_unique(joints.iter().map(|j| j.name.as_str()), EntityCategory::Joint)?;
        check_unique(
            materials.iter().map(|m| m.name.as_str()),
            EntityCategory::Material,
        )?;

        let lookup = |joint: &Joint, link: &str| -> Result<LinkIndex, Error> {
            link_by_name
                .get(link)
                .copied()
                .ok_or_else(|| Error::UnknownLink {
                    joint: joint.name.clone(),
                    link: link.to_string(),
                })
        };

        let mut joint_links = Vec::with_capacity(joints.len());
        let mut parent_of: Vec<Option<JointIndex>> = vec![None; links.len()];
        let mut children_of: Vec<Vec<JointIndex>> = vec![Vec::new(); links.len()];
        for (index, joint) in joints.iter().enumerate() {
            let parent = lookup(joint, &joint.parent_link)?;
            let child = lookup(joint, &joint.child_link)?;

            if parent_of[child.0].is_some() {
                return Err(Error::LinkHasMultipleParents {
                    link: joint.child_link.clone(),
                });
            }

            parent_of[child.0] = Some(JointIndex(index));
            children_of[parent.0].push(JointIndex(index));
            joint_links.push((parent, child));
        }

        let roots: Vec<usize> = (0..links.len())
            .filter(|index| parent_of[*index].is_none())
            .collect();
        let root = match roots.as_slice() {
            [] => return Err(Error::MissingRootLink),
            [root] => LinkIndex(*root),
            _ => {
                return Err(Error::MultipleRootLinks {
                    names: roots.iter().map(|i| links[*i].name.clone()).collect(),
                })
            }
        };

        let result = Self {
            name: name.into(),
            links,
            joints,
            materials,
            link_by_name,
            joint_links,
            parent_of,
            children_of,
            root,
        };

        // A link that is not reachable from the root sits on a cycle, because every link
        // except the root has exactly one parent.
        let mut reached = vec![false; result.links.len()];
        for link in result.walk() {
            reached[link.0] = true;
        }
        if let Some(index) = reached.iter().position(|r| !*r) {
            return Err(Error::CyclicKinematicTree {
                link: result.links[index].name.clone(),
            });
        }

        Ok(result)
    }

    /// Returns the parent joint of the link, or `None` for the root link.
    pub fn parent_joint(&self, link: LinkIndex) -> Option<JointIndex> {
        self.parent_of[link.0]
    }

    /// Returns the parent link of the link, or `None` for the root link.
    pub fn parent_link(&self, link: LinkIndex) -> Option<LinkIndex> {
        self.parent_of[link.0].map(|joint| self.joint_links[joint.0].0)
    }

    /// Returns the root link.
    pub fn root(&self) -> LinkIndex {
        self.root
    }

    /// Returns the links in pre-order, starting at the root. The children of a link are visited
    /// in document order.
    pub fn walk(&self) -> Vec<LinkIndex> {
        let mut order = Vec::with_capacity(self.links.len());
        let mut stack = vec![self.root];
        while let Some(link) = stack.pop() {
            order.push(link);
            for joint in self.children_of[link.0].iter().rev() {
                stack.push(self.joint_links[joint.0].1);
            }
        }

        order
    }
}

fn check_unique<'a, I>(names: I, category: EntityCategory) -> Result<(), Error>
where
    I: Iterator<Item = &'a str>,
{
    let mut seen = std::collections::HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(Error::DuplicateName {
                category,
                name: name.to_string(),
            });
        }
    }

    Ok(())
}
